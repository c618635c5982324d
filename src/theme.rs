use serde::{Deserialize, Deserializer, Serialize};

pub type Rgb = (u8, u8, u8);

/// Used whenever a palette has nothing usable in it.
pub const FALLBACK_COLOR: Rgb = (255, 255, 255);

pub const FREQUENCY_RANGE: (f32, f32) = (0.0, 0.15);
pub const COUNT_RANGE: (usize, usize) = (20, 300);
pub const SIZE_RANGE: (f32, f32) = (0.5, 5.0);

/// Largest burst a theme can ask for, whatever number it carries.
pub const MAX_PARTICLE_COUNT: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Standard,
    Ring,
    Heart,
    Star,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [Pattern::Standard, Pattern::Ring, Pattern::Heart, Pattern::Star];

    pub fn name(self) -> &'static str {
        match self {
            Pattern::Standard => "standard",
            Pattern::Ring => "ring",
            Pattern::Heart => "heart",
            Pattern::Star => "star",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Self {
        match self {
            Pattern::Standard => Pattern::Ring,
            Pattern::Ring => Pattern::Heart,
            Pattern::Heart => Pattern::Star,
            Pattern::Star => Pattern::Standard,
        }
    }
}

/// Everything that shapes a show: palette, launch rate, burst density and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub colors: Vec<String>,
    pub launch_frequency: f32,
    #[serde(deserialize_with = "count_from_number")]
    pub particle_count: usize,
    pub particle_size: f32,
    #[serde(rename = "explosionType")]
    pub pattern: Pattern,
}

// Generated themes tend to send counts as floats (e.g. 120.0), and a negative count
// has to become an empty burst rather than a parse failure. Huge counts are capped.
fn count_from_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    if n.is_finite() && n > 0.0 {
        Ok(n.round().min(MAX_PARTICLE_COUNT as f64) as usize)
    } else {
        Ok(0)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "Aurora Classic".to_string(),
            description: "A serene dance of emerald and violet across the night sky.".to_string(),
            colors: ["#10b981", "#8b5cf6", "#f43f5e", "#fbbf24"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            launch_frequency: 0.03,
            particle_count: 120,
            particle_size: 2.0,
            pattern: Pattern::Standard,
        }
    }
}

impl Theme {
    /// Substituted whenever a generated theme cannot be understood.
    pub fn stellar_default() -> Self {
        Self {
            name: "Stellar Default".to_string(),
            description: "A classic display of light and color.".to_string(),
            colors: ["#ffffff", "#ff0000", "#00ff00", "#0000ff"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            launch_frequency: 0.05,
            particle_count: 100,
            particle_size: 2.0,
            pattern: Pattern::Standard,
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    // Lab adjustments stay inside the slider ranges of the controls. Values that
    // arrive from elsewhere are left alone.

    pub fn with_frequency_step(mut self, delta: f32) -> Self {
        let (lo, hi) = FREQUENCY_RANGE;
        self.launch_frequency = (self.launch_frequency + delta).clamp(lo, hi);
        self
    }

    pub fn with_size_step(mut self, delta: f32) -> Self {
        let (lo, hi) = SIZE_RANGE;
        self.particle_size = (self.particle_size + delta).clamp(lo, hi);
        self
    }

    pub fn with_count_step(mut self, delta: isize) -> Self {
        let (lo, hi) = COUNT_RANGE;
        let count = self.particle_count as isize + delta;
        self.particle_count = count.clamp(lo as isize, hi as isize) as usize;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_color_added(mut self, color: &str) -> Self {
        self.colors.push(color.to_string());
        self
    }

    /// Replaces the color at `index`. An index past the end changes nothing.
    pub fn with_color_set(mut self, index: usize, color: &str) -> Self {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color.to_string();
        }
        self
    }

    /// Drops the color at `index`, but a theme edited in the lab always keeps one.
    pub fn with_color_removed(mut self, index: usize) -> Self {
        if self.colors.len() > 1 && index < self.colors.len() {
            self.colors.remove(index);
        }
        self
    }
}

pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
            Some((r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

/// A theme's colors, parsed once per theme change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn from_theme(theme: &Theme) -> Self {
        let colors = theme
            .colors
            .iter()
            .filter_map(|c| {
                let parsed = parse_hex_color(c);
                if parsed.is_none() {
                    log::warn!("theme '{}': skipping unreadable color {:?}", theme.name, c);
                }
                parsed
            })
            .collect();
        Self { colors }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn pick(&self, rng: &mut fastrand::Rng) -> Rgb {
        if self.colors.is_empty() {
            return FALLBACK_COLOR;
        }
        self.colors[rng.usize(0..self.colors.len())]
    }
}
