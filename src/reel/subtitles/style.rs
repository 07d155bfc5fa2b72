//! Burn-in style for subtitles rendered by ffmpeg's `subtitles` filter.

/// Style passed to libass through `force_style`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStyle {
    /// Font family name
    pub font_name: String,
    /// Font size in script pixels
    pub font_size: u32,
    /// Text color in ABGR format (e.g. &H00FFFFFF for white)
    pub primary_color: String,
    /// Outline color in ABGR format
    pub outline_color: String,
    /// Shadow color in ABGR format
    pub back_color: String,
    /// Outline width in pixels
    pub outline: u32,
    /// Shadow depth in pixels
    pub shadow: u32,
    /// Alignment (numpad layout: 1-3=bottom, 4-6=mid, 7-9=top)
    pub alignment: u8,
    /// Distance from the bottom edge
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self::bottom_caption("Sans", 64, 160, 3, 1)
    }
}

impl SubtitleStyle {
    /// White text with a black outline and a soft drop shadow, anchored
    /// bottom-center.
    pub fn bottom_caption(
        font_name: &str,
        font_size: u32,
        margin_v: u32,
        outline: u32,
        shadow: u32,
    ) -> Self {
        Self {
            font_name: font_name.to_string(),
            font_size,
            primary_color: "&H00FFFFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            // Black at ~50% opacity
            back_color: "&H80000000".to_string(),
            outline,
            shadow,
            alignment: 2,
            margin_v,
        }
    }

    /// Comma separated `force_style` value.
    pub fn to_force_style(&self) -> String {
        format!(
            "FontName={font},FontSize={size},PrimaryColour={primary},OutlineColour={outline_color},BackColour={back},BorderStyle=1,Outline={outline},Shadow={shadow},Alignment={align},MarginV={mv}",
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            outline_color = self.outline_color,
            back = self.back_color,
            outline = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            mv = self.margin_v,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_style_is_bottom_anchored_with_outline_and_shadow() {
        let style = SubtitleStyle::bottom_caption("Inter", 72, 200, 4, 2);
        let forced = style.to_force_style();
        assert!(forced.starts_with("FontName=Inter,FontSize=72,"));
        assert!(forced.contains("PrimaryColour=&H00FFFFFF"));
        assert!(forced.contains("Outline=4,Shadow=2,Alignment=2,MarginV=200"));
    }
}
