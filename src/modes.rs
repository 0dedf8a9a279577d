// Modes Module - Last-known animation modes and the mode selector
use crate::dom::{self, Document, DomError, Element};

/// Holds the mode list from the last rebuild of the selector.
#[derive(Debug, Clone, Default)]
pub struct ModeRegistry {
    current_modes: Vec<String>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modes(&self) -> &[String] {
        &self.current_modes
    }

    /// Rebuild the selector from `new_modes` if its length differs from the
    /// held list.
    ///
    /// Only the count is compared: a same-length list with different or
    /// reordered names is ignored and the selector keeps its old options.
    /// The list is adopted only once the selector has been rewritten, so a
    /// failed rebuild is retried on the next poll. Returns whether it rebuilt.
    pub fn reconcile(&mut self, document: &mut Document, new_modes: &[String]) -> Result<bool, DomError> {
        if self.current_modes.len() == new_modes.len() {
            return Ok(false);
        }
        write_options(document, new_modes)?;
        self.current_modes = new_modes.to_vec();
        Ok(true)
    }
}

fn write_options(document: &mut Document, modes: &[String]) -> Result<(), DomError> {
    let picker = document.element_mut(dom::MODE_SELECT)?;
    picker.clear_children();
    for mode in modes {
        picker.append_child(
            Element::new("option")
                .with_attr("value", mode.clone())
                .with_text(title_case(mode)),
        );
    }
    Ok(())
}

/// Upper-case the first word character at the start of the string and after
/// each whitespace character. Everything else is left as-is.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_boundary = true;
    for c in raw.chars() {
        if at_boundary && (c.is_alphanumeric() || c == '_') {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = c.is_whitespace();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn option_labels(doc: &Document) -> Vec<(String, String)> {
        doc.element(dom::MODE_SELECT)
            .unwrap()
            .children
            .iter()
            .map(|o| (o.attr("value").unwrap_or_default().to_string(), o.text.clone()))
            .collect()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("rainbow"), "Rainbow");
        assert_eq!(title_case("color wipe"), "Color Wipe");
        assert_eq!(title_case("theater  chase rainbow"), "Theater  Chase Rainbow");
        assert_eq!(title_case("blink-slow"), "Blink-slow");
        assert_eq!(title_case("fire mEDIUM"), "Fire MEDIUM");
        assert_eq!(title_case(" -dash"), " -dash");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_equal_count_does_not_rebuild() {
        let mut doc = Document::dashboard();
        let mut registry = ModeRegistry::new();
        assert!(registry.reconcile(&mut doc, &modes(&["rainbow", "chase"])).unwrap());

        // Different content, same cardinality
        assert!(!registry.reconcile(&mut doc, &modes(&["fire", "twinkle"])).unwrap());
        assert!(!registry.reconcile(&mut doc, &modes(&["chase", "rainbow"])).unwrap());
        assert_eq!(registry.modes(), &modes(&["rainbow", "chase"])[..]);
        assert_eq!(option_labels(&doc)[0].1, "Rainbow");
    }

    #[test]
    fn test_count_change_rebuilds_in_order() {
        let mut doc = Document::dashboard();
        let mut registry = ModeRegistry::new();

        assert!(registry.reconcile(&mut doc, &modes(&["rainbow", "chase"])).unwrap());
        assert_eq!(
            option_labels(&doc),
            vec![
                ("rainbow".to_string(), "Rainbow".to_string()),
                ("chase".to_string(), "Chase".to_string()),
            ]
        );

        assert!(registry.reconcile(&mut doc, &modes(&["color wipe", "fire", "off"])).unwrap());
        let labels: Vec<String> = option_labels(&doc).into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["Color Wipe", "Fire", "Off"]);
    }

    #[test]
    fn test_empty_list_from_fresh_registry_is_not_a_change() {
        let mut doc = Document::dashboard();
        let mut registry = ModeRegistry::new();
        assert!(!registry.reconcile(&mut doc, &[]).unwrap());
        assert!(registry.reconcile(&mut doc, &modes(&["solo"])).unwrap());
        assert!(registry.reconcile(&mut doc, &[]).unwrap());
        assert!(registry.modes().is_empty());
    }

    #[test]
    fn test_failed_rebuild_is_not_adopted() {
        let mut doc = Document::dashboard();
        doc.remove(dom::MODE_SELECT);
        let mut registry = ModeRegistry::new();

        assert_eq!(
            registry.reconcile(&mut doc, &modes(&["rainbow"])),
            Err(DomError::MissingElement(dom::MODE_SELECT.to_string()))
        );
        assert!(registry.modes().is_empty());

        // Same list against a healthy document is still seen as a change
        let mut doc = Document::dashboard();
        assert!(registry.reconcile(&mut doc, &modes(&["rainbow"])).unwrap());
        assert_eq!(option_labels(&doc), vec![("rainbow".to_string(), "Rainbow".to_string())]);
    }
}
