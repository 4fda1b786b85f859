use std::num::NonZeroUsize;

use lru::LruCache;

pub const DEFAULT_FONT: &str = "verdana-11px-rounded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsStats {
    pub hits: u64,
    pub misses: u64,
}

impl MetricsStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64)
        }
    }
}

/// Measured text extents by (font, text). Floating numbers and creature names
/// repeat every frame, so lookups are cached with LRU eviction.
pub struct TextMetricsCache {
    cache: LruCache<(String, String), TextSize>,
    stats: MetricsStats,
}

impl TextMetricsCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            stats: MetricsStats::default(),
        }
    }

    pub fn measure(&mut self, font: &str, text: &str) -> TextSize {
        let key = (font.to_string(), text.to_string());
        if let Some(size) = self.cache.get(&key) {
            self.stats.hits += 1;
            return *size;
        }
        self.stats.misses += 1;
        let size = measure_uncached(font, text);
        self.cache.put(key, size);
        size
    }

    pub fn stats(&self) -> &MetricsStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Glyph height is taken from a `<n>px` token in the font name; glyphs are
/// assumed to be roughly 0.6 of the height wide.
fn measure_uncached(font: &str, text: &str) -> TextSize {
    let height = font_pixel_height(font).unwrap_or(11);
    let glyph_width = ((height as f32) * 0.6).ceil() as i32;
    let widest_line = text
        .lines()
        .map(|line| line.chars().count() as i32)
        .max()
        .unwrap_or(0);
    let lines = text.lines().count().max(1) as i32;
    TextSize {
        width: widest_line * glyph_width,
        height: lines * (height + 1),
    }
}

fn font_pixel_height(font: &str) -> Option<i32> {
    font.split(|c: char| c == '-' || c == ' ')
        .find_map(|token| token.strip_suffix("px"))
        .and_then(|digits| digits.parse::<i32>().ok())
        .filter(|height| *height > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_from_font_height() {
        let mut cache = TextMetricsCache::new(4);
        let size = cache.measure("10px sans-serif", "120");
        assert_eq!(size, TextSize { width: 18, height: 11 });
        let two_lines = cache.measure(DEFAULT_FONT, "Rat\nHunter");
        assert_eq!(two_lines.width, 6 * 7);
        assert_eq!(two_lines.height, 24);
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let mut cache = TextMetricsCache::new(2);
        cache.measure(DEFAULT_FONT, "a");
        cache.measure(DEFAULT_FONT, "a");
        cache.measure(DEFAULT_FONT, "b");
        cache.measure(DEFAULT_FONT, "c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 3);
        cache.measure(DEFAULT_FONT, "a");
        assert_eq!(cache.stats().misses, 4);
    }
}
