// src/map/markers.rs
//! Marker icon types and their placed markers

use crate::error::{MapError, Result};

/// A marker placed on the map, in global pixels at 100% zoom relative to
/// the shared map origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub info: Option<String>,
}

impl Marker {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, info: None }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// Display size and anchor of an icon, as CSS lengths handed untouched to
/// the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct IconGeometry {
    pub size_x: String,
    pub size_y: String,
    pub offset_x: String,
    pub offset_y: String,
}

impl Default for IconGeometry {
    fn default() -> Self {
        Self {
            size_x: "2.2rem".to_string(),
            size_y: "2.2rem".to_string(),
            offset_x: "-1.1rem".to_string(),
            offset_y: "-1.1rem".to_string(),
        }
    }
}

/// An icon type owning every marker drawn with it. Each icon gets its own
/// overlay layer so a whole type can be filtered at once.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub name: String,
    pub image_uri: String,
    pub geometry: IconGeometry,
    /// Markers of this type hide below this global zoom
    pub zoom_level: f64,
    enabled: bool,
    markers: Vec<Marker>,
    index: usize,
}

impl MarkerIcon {
    pub fn new(name: impl Into<String>, image_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_uri: image_uri.into(),
            geometry: IconGeometry::default(),
            zoom_level: 0.0,
            enabled: true,
            markers: Vec::new(),
            index: 0,
        }
    }

    /// Round icon with a one-character label, as an inline SVG data URI
    pub fn simple(name: impl Into<String>, bg_color: &str, fg_color: &str, label: &str) -> Self {
        let bg = bg_color.trim_start_matches('#');
        let fg = fg_color.trim_start_matches('#');
        let label = label
            .replace('&', "&amp;")
            .replace('#', "%23")
            .replace('<', "&lt;");
        let image_uri = format!(
            concat!(
                "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 20 20\">",
                "<circle cx=\"10\" cy=\"10\" r=\"9\" fill=\"%23{bg}\" stroke=\"%23{fg}\" stroke-width=\"1\"/>",
                "<text x=\"10\" y=\"11\" text-anchor=\"middle\" dominant-baseline=\"middle\" ",
                "font-family=\"Courier New\" font-size=\"15\" font-weight=\"bold\" fill=\"%23{fg}\">{label}</text></svg>"
            ),
            bg = bg,
            fg = fg,
            label = label
        );
        Self::new(name, image_uri)
    }

    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_zoom_level(mut self, zoom_level: f64) -> Self {
        self.zoom_level = zoom_level;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Layer shown at this zoom: filter enabled and zoomed in far enough
    pub fn is_layer_visible(&self, global_zoom: f64) -> bool {
        self.enabled && global_zoom >= self.zoom_level
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Append a marker, returning its position in the layer
    pub fn add_marker(&mut self, marker: Marker) -> usize {
        self.markers.push(marker);
        self.markers.len() - 1
    }

    pub fn remove_marker(&mut self, marker_index: usize) -> Result<Marker> {
        if marker_index >= self.markers.len() {
            return Err(MapError::UnknownMarker { icon: self.index, marker: marker_index });
        }
        Ok(self.markers.remove(marker_index))
    }

    /// Tooltip markup: icon name plus the marker's info line
    pub fn tooltip(&self, marker: &Marker) -> String {
        match &marker.info {
            Some(info) if !info.is_empty() => format!("{}<br>{}", self.name, info),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_visibility() {
        let mut icon = MarkerIcon::new("Camp", "camp.svg").with_zoom_level(40.0);
        assert!(!icon.is_layer_visible(39.9));
        assert!(icon.is_layer_visible(40.0));
        icon.set_enabled(false);
        assert!(!icon.is_layer_visible(400.0));
    }

    #[test]
    fn test_add_and_remove_markers() {
        let mut icon = MarkerIcon::new("Camp", "camp.svg");
        assert_eq!(icon.add_marker(Marker::new(1.0, 2.0)), 0);
        assert_eq!(icon.add_marker(Marker::new(3.0, 4.0).with_info("north gate")), 1);

        let removed = icon.remove_marker(0).unwrap();
        assert_eq!(removed, Marker::new(1.0, 2.0));
        assert_eq!(icon.markers()[0].info.as_deref(), Some("north gate"));
        assert!(matches!(icon.remove_marker(5), Err(MapError::UnknownMarker { marker: 5, .. })));
    }

    #[test]
    fn test_simple_icon_uri() {
        let icon = MarkerIcon::simple("Shop", "#a0c", "fff", "#");
        assert!(icon.image_uri.starts_with("data:image/svg+xml,<svg"));
        assert!(icon.image_uri.contains("fill=\"%23a0c\""));
        assert!(icon.image_uri.contains("stroke=\"%23fff\""));
        assert!(icon.image_uri.contains(">%23</text>"));
    }

    #[test]
    fn test_tooltip() {
        let icon = MarkerIcon::new("Shop", "shop.svg");
        assert_eq!(icon.tooltip(&Marker::new(0.0, 0.0)), "Shop");
        assert_eq!(icon.tooltip(&Marker::new(0.0, 0.0).with_info("Open late")), "Shop<br>Open late");
    }
}
