// Palette Module - Color picker swatches
use serde::{Deserialize, Serialize};

use crate::dispatch::Command;
use crate::dom::{self, Document, DomError, Element};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swatch {
    pub name: String,
    pub hex: String,
}

impl Swatch {
    pub fn new(name: &str, hex: &str) -> Self {
        Swatch {
            name: name.to_string(),
            hex: hex.to_string(),
        }
    }
}

// Subset of the controller's named colors; a fuller table goes in the config file
pub fn default_palette() -> Vec<Swatch> {
    vec![
        Swatch::new("Black", "#000"),
        Swatch::new("White", "#fff"),
        Swatch::new("Red", "#f00"),
        Swatch::new("OrangeRed", "#ff4500"),
        Swatch::new("Orange", "#ffa500"),
        Swatch::new("Gold", "#ffd700"),
        Swatch::new("Yellow", "#ff0"),
        Swatch::new("Lime", "#0f0"),
        Swatch::new("Green", "#008000"),
        Swatch::new("SpringGreen", "#00ff7f"),
        Swatch::new("Cyan", "#0ff"),
        Swatch::new("DeepSkyBlue", "#00bfff"),
        Swatch::new("Blue", "#00f"),
        Swatch::new("Navy", "#000080"),
        Swatch::new("Indigo", "#4b0082"),
        Swatch::new("Purple", "#800080"),
        Swatch::new("Magenta", "#f0f"),
        Swatch::new("DeepPink", "#ff1493"),
        Swatch::new("HotPink", "#ff69b4"),
    ]
}

/// Fill `color_picker` with one clickable swatch per palette entry.
pub fn populate_color_picker(document: &mut Document, palette: &[Swatch]) -> Result<(), DomError> {
    let holder = document.element_mut(dom::COLOR_PICKER)?;
    holder.clear_children();

    for swatch in palette {
        let mut span = Element::new("span")
            .with_class("swatch")
            .with_attr("data-color", swatch.name.clone())
            .with_text("⬤")
            .with_title(format!("Set all leds to: {}", swatch.name))
            .with_command(Command::Color(swatch.name.clone()).path());
        span.style.background_color = Some(swatch.hex.clone());
        span.style.padding = Some(".5em".to_string());
        span.style.display = Some("inline-block".to_string());
        span.style.cursor = Some("pointer".to_string());
        holder.append_child(span);
    }
    Ok(())
}
