// Renderer Module - Projects strand/LED state into the led_results target
use std::collections::BTreeMap;

use crate::dom::{self, Document, DomError, Element};
use crate::snapshot::{LedState, SlotId, StrandState};

// A spacer follows every LED whose index is 29 mod 30 (wrapping aid only)
const LEDS_PER_ROW: i64 = 30;

pub const LED_GLYPH: &str = "⬤";

/// Replace everything under `led_results` with one container per strand.
///
/// Full rebuild every time: nothing from the previous render is kept or
/// compared, so rendering the same strands twice yields the same tree.
pub fn render_strands(
    document: &mut Document,
    strands: &BTreeMap<SlotId, StrandState>,
) -> Result<(), DomError> {
    let holder = document.element_mut(dom::LED_RESULTS)?;
    holder.clear_children();

    for (strand_id, strand) in strands {
        holder.append_child(strand_container(strand_id, strand));
    }
    Ok(())
}

fn strand_container(strand_id: &SlotId, strand: &StrandState) -> Element {
    let mut strand_div = Element::new("div")
        .with_class("strand")
        .with_attr("data-strand", strand_id.as_str())
        .with_text(strand_id.as_str())
        .with_title(format!(
            "Strand: {}, pin: {}",
            strand.strand_name,
            strand.pin_label()
        ));
    strand_div.style.padding = Some("6px".to_string());

    for (led_id, led) in &strand.led_info {
        strand_div.append_child(led_indicator(led_id, led));

        if led_id.leading_int().map(|n| n % LEDS_PER_ROW) == Some(LEDS_PER_ROW - 1) {
            strand_div.append_child(Element::new("span").with_class("spacer").with_text(" "));
        }
    }
    strand_div
}

fn led_indicator(led_id: &SlotId, led: &LedState) -> Element {
    let mut span = Element::new("span")
        .with_class("led")
        .with_attr("data-led", led_id.as_str())
        .with_text(LED_GLYPH)
        .with_title(format!(
            "[{}], Name: {}, Current Color: [{}], Animation Text: {}",
            led_id, led.name, led.color, led.animation_text
        ));
    span.style.color = Some(led.color.clone());
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DeviceSnapshot;

    fn strand_with_leds(count: usize) -> BTreeMap<SlotId, StrandState> {
        let mut strand = StrandState {
            strand_name: "Porch".to_string(),
            ..Default::default()
        };
        strand.strand_info.pin = Some(serde_json::json!(18));
        for i in 0..count {
            strand.led_info.insert(
                SlotId::new(i.to_string()),
                LedState {
                    name: format!("led{}", i),
                    color: "#00ff00".to_string(),
                    animation_text: String::new(),
                },
            );
        }
        let mut strands = BTreeMap::new();
        strands.insert(SlotId::from("0"), strand);
        strands
    }

    #[test]
    fn test_spacer_after_index_29_only() {
        let mut doc = Document::dashboard();
        render_strands(&mut doc, &strand_with_leds(35)).unwrap();

        let strand = &doc.element(dom::LED_RESULTS).unwrap().children[0];
        assert_eq!(strand.children.len(), 36);

        let spacers: Vec<usize> = strand
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_class("spacer"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(spacers, vec![30]);
        assert_eq!(strand.children[29].attr("data-led"), Some("29"));
        assert_eq!(strand.children[31].attr("data-led"), Some("30"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let strands = strand_with_leds(64);
        let mut doc = Document::dashboard();
        render_strands(&mut doc, &strands).unwrap();
        let first = doc.clone();
        render_strands(&mut doc, &strands).unwrap();
        assert_eq!(doc, first);
    }

    #[test]
    fn test_render_replaces_previous_output() {
        let mut doc = Document::dashboard();
        render_strands(&mut doc, &strand_with_leds(10)).unwrap();
        render_strands(&mut doc, &BTreeMap::new()).unwrap();
        assert!(doc.element(dom::LED_RESULTS).unwrap().children.is_empty());
    }

    #[test]
    fn test_led_and_strand_tooltips() {
        let snapshot = DeviceSnapshot::from_json(
            r##"{"modes": [], "strands": {"0": {"strand_name": "Porch", "strand_info": {"pin": 18},
                "led_info": {"0": {"name": "A", "color": "#ff0000", "animation_text": "fade"}}}}}"##,
        )
        .unwrap();
        let mut doc = Document::dashboard();
        render_strands(&mut doc, &snapshot.strands).unwrap();

        let strand = &doc.element(dom::LED_RESULTS).unwrap().children[0];
        assert_eq!(strand.text, "0");
        assert_eq!(strand.title.as_deref(), Some("Strand: Porch, pin: 18"));
        assert_eq!(strand.style.padding.as_deref(), Some("6px"));

        let led = &strand.children[0];
        assert_eq!(led.text, LED_GLYPH);
        assert_eq!(led.style.color.as_deref(), Some("#ff0000"));
        assert_eq!(
            led.title.as_deref(),
            Some("[0], Name: A, Current Color: [#ff0000], Animation Text: fade")
        );
    }

    #[test]
    fn test_strands_follow_numeric_order() {
        let mut strands = BTreeMap::new();
        for id in ["10", "2", "porch"] {
            strands.insert(SlotId::from(id), StrandState::default());
        }
        let mut doc = Document::dashboard();
        render_strands(&mut doc, &strands).unwrap();
        let labels: Vec<&str> = doc
            .element(dom::LED_RESULTS)
            .unwrap()
            .children
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(labels, vec!["2", "10", "porch"]);
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let mut doc = Document::dashboard();
        doc.remove(dom::LED_RESULTS);
        assert!(render_strands(&mut doc, &strand_with_leds(1)).is_err());
    }
}
