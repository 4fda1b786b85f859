use bitflags::bitflags;

use crate::render::color::Rgb;
use crate::world::thing_types::ThingCategory;

const HSI_SI_VALUES: u16 = 7;
const HSI_H_STEPS: u16 = 19;

/// (saturation, value) rows of the outfit palette, one per hue band.
const SATURATION_VALUE: [(f64, f64); HSI_SI_VALUES as usize] = [
    (0.25, 1.00),
    (0.25, 0.75),
    (0.50, 0.75),
    (0.667, 0.75),
    (1.00, 1.00),
    (1.00, 0.75),
    (1.00, 0.50),
];

pub const DEFAULT_OUTFIT_SHADER: &str = "Outfit - Default";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Addons: u8 {
        const FIRST = 1;
        const SECOND = 2;
    }
}

/// Appearance of a creature. Body-part colors are stored as palette indices
/// with their RGB value cached next to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Outfit {
    category: Option<ThingCategory>,
    temp: bool,
    look_type: u16,
    aux_id: u16,
    mount: u16,
    familiar: u16,
    wing: u16,
    aura: u16,
    effect: u16,
    shader: String,
    head: u8,
    body: u8,
    legs: u8,
    feet: u8,
    addons: Addons,
    head_color: Rgb,
    body_color: Rgb,
    legs_color: Rgb,
    feet_color: Rgb,
}

impl Default for Outfit {
    fn default() -> Self {
        Self {
            category: None,
            temp: false,
            look_type: 0,
            aux_id: 0,
            mount: 0,
            familiar: 0,
            wing: 0,
            aura: 0,
            effect: 0,
            shader: String::new(),
            head: 0,
            body: 0,
            legs: 0,
            feet: 0,
            addons: Addons::empty(),
            head_color: Rgb::WHITE,
            body_color: Rgb::WHITE,
            legs_color: Rgb::WHITE,
            feet_color: Rgb::WHITE,
        }
    }
}

impl Outfit {
    pub fn new(look_type: u16) -> Self {
        Self {
            category: Some(ThingCategory::Creature),
            look_type,
            ..Self::default()
        }
    }

    /// HSI palette lookup. Indices past the table wrap to 0.
    pub fn get_color(index: u16) -> Rgb {
        let index = if index >= HSI_H_STEPS * HSI_SI_VALUES {
            0
        } else {
            index
        };

        let (hue, saturation, value) = if index % HSI_H_STEPS != 0 {
            let hue = f64::from(index % HSI_H_STEPS) / 18.0;
            let (saturation, value) = SATURATION_VALUE[usize::from(index / HSI_H_STEPS)];
            (hue, saturation, value)
        } else {
            let value = 1.0 - f64::from(index) / f64::from(HSI_H_STEPS) / f64::from(HSI_SI_VALUES);
            (0.0, 0.0, value)
        };

        if value <= 0.0 {
            return Rgb::BLACK;
        }
        if saturation == 0.0 {
            let gray = to_channel(value);
            return Rgb::new(gray, gray, gray);
        }

        let (red, green, blue);
        if hue < 1.0 / 6.0 {
            red = value;
            blue = value * (1.0 - saturation);
            green = blue + (value - blue) * 6.0 * hue;
        } else if hue < 2.0 / 6.0 {
            green = value;
            blue = value * (1.0 - saturation);
            red = green - (value - blue) * (6.0 * hue - 1.0);
        } else if hue < 3.0 / 6.0 {
            green = value;
            red = value * (1.0 - saturation);
            blue = red + (value - red) * (6.0 * hue - 2.0);
        } else if hue < 4.0 / 6.0 {
            blue = value;
            red = value * (1.0 - saturation);
            green = blue - (value - red) * (6.0 * hue - 3.0);
        } else if hue < 5.0 / 6.0 {
            blue = value;
            green = value * (1.0 - saturation);
            red = green + (value - green) * (6.0 * hue - 4.0);
        } else {
            red = value;
            green = value * (1.0 - saturation);
            blue = red - (value - green) * (6.0 * hue - 5.0);
        }
        Rgb::new(to_channel(red), to_channel(green), to_channel(blue))
    }

    pub fn category(&self) -> Option<ThingCategory> {
        self.category
    }

    pub fn set_category(&mut self, category: Option<ThingCategory>) {
        self.category = category;
    }

    pub fn is_creature(&self) -> bool {
        self.category == Some(ThingCategory::Creature)
    }

    pub fn is_invalid(&self) -> bool {
        self.category.is_none()
    }

    pub fn is_temp(&self) -> bool {
        self.temp
    }

    pub fn set_temp(&mut self, temp: bool) {
        self.temp = temp;
    }

    pub fn look_type(&self) -> u16 {
        self.look_type
    }

    pub fn set_look_type(&mut self, look_type: u16) {
        self.look_type = look_type;
    }

    pub fn aux_id(&self) -> u16 {
        self.aux_id
    }

    pub fn set_aux_id(&mut self, aux_id: u16) {
        self.aux_id = aux_id;
    }

    pub fn mount(&self) -> u16 {
        self.mount
    }

    pub fn set_mount(&mut self, mount: u16) {
        self.mount = mount;
    }

    pub fn has_mount(&self) -> bool {
        self.mount > 0
    }

    pub fn familiar(&self) -> u16 {
        self.familiar
    }

    pub fn set_familiar(&mut self, familiar: u16) {
        self.familiar = familiar;
    }

    pub fn wing(&self) -> u16 {
        self.wing
    }

    pub fn set_wing(&mut self, wing: u16) {
        self.wing = wing;
    }

    pub fn aura(&self) -> u16 {
        self.aura
    }

    pub fn set_aura(&mut self, aura: u16) {
        self.aura = aura;
    }

    pub fn effect(&self) -> u16 {
        self.effect
    }

    pub fn set_effect(&mut self, effect: u16) {
        self.effect = effect;
    }

    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn set_shader(&mut self, shader: impl Into<String>) {
        self.shader = shader.into();
    }

    pub fn addons(&self) -> Addons {
        self.addons
    }

    pub fn set_addons(&mut self, addons: Addons) {
        self.addons = addons;
    }

    /// Whether addon layer `layer` (1-based pattern y) is worn.
    pub fn has_addon_layer(&self, layer: u32) -> bool {
        if layer == 0 {
            return true;
        }
        layer <= 8 && self.addons.bits() & (1 << (layer - 1)) != 0
    }

    pub fn head(&self) -> u8 {
        self.head
    }

    pub fn body(&self) -> u8 {
        self.body
    }

    pub fn legs(&self) -> u8 {
        self.legs
    }

    pub fn feet(&self) -> u8 {
        self.feet
    }

    pub fn set_head(&mut self, head: u8) {
        if self.head != head {
            self.head = head;
            self.head_color = Self::get_color(u16::from(head));
        }
    }

    pub fn set_body(&mut self, body: u8) {
        if self.body != body {
            self.body = body;
            self.body_color = Self::get_color(u16::from(body));
        }
    }

    pub fn set_legs(&mut self, legs: u8) {
        if self.legs != legs {
            self.legs = legs;
            self.legs_color = Self::get_color(u16::from(legs));
        }
    }

    pub fn set_feet(&mut self, feet: u8) {
        if self.feet != feet {
            self.feet = feet;
            self.feet_color = Self::get_color(u16::from(feet));
        }
    }

    pub fn head_color(&self) -> Rgb {
        self.head_color
    }

    pub fn body_color(&self) -> Rgb {
        self.body_color
    }

    pub fn legs_color(&self) -> Rgb {
        self.legs_color
    }

    pub fn feet_color(&self) -> Rgb {
        self.feet_color
    }

    pub fn reset_clothes(&mut self) {
        self.set_head(0);
        self.set_body(0);
        self.set_legs(0);
        self.set_feet(0);
        self.mount = 0;
        self.familiar = 0;
        self.wing = 0;
        self.aura = 0;
        self.effect = 0;
        self.shader = DEFAULT_OUTFIT_SHADER.to_string();
    }
}

fn to_channel(value: f64) -> u8 {
    (value * 255.0).floor().clamp(0.0, 255.0) as u8
}
