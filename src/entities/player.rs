/// Player-specific state carried by a creature of kind `Player`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Player {
    vocation: u8,
    local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocation {
    None,
    Sorcerer,
    Druid,
    MasterSorcerer,
    ElderDruid,
    Monk,
    ExaltedMonk,
    Other(u8),
}

impl Vocation {
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => Vocation::None,
            1 => Vocation::Sorcerer,
            2 => Vocation::Druid,
            3 => Vocation::MasterSorcerer,
            4 => Vocation::ElderDruid,
            5 => Vocation::Monk,
            6 => Vocation::ExaltedMonk,
            other => Vocation::Other(other),
        }
    }
}

impl Player {
    pub fn new(vocation: u8) -> Self {
        Self {
            vocation,
            local: false,
        }
    }

    /// The player controlled by this client.
    pub fn local(vocation: u8) -> Self {
        Self {
            vocation,
            local: true,
        }
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn vocation_id(&self) -> u8 {
        self.vocation
    }

    pub fn vocation(&self) -> Vocation {
        Vocation::from_id(self.vocation)
    }

    pub fn set_vocation(&mut self, vocation: u8) {
        self.vocation = vocation;
    }

    pub fn is_mage(&self) -> bool {
        matches!(
            self.vocation(),
            Vocation::Sorcerer | Vocation::Druid | Vocation::MasterSorcerer | Vocation::ElderDruid
        )
    }

    pub fn is_monk(&self) -> bool {
        matches!(self.vocation(), Vocation::Monk | Vocation::ExaltedMonk)
    }
}
