//! Inbound-text classification rules.
//!
//! Fast regex matching, first match wins:
//! - greeting words or a bare menu digit → menu intent
//! - the order keyword → order intake with the remainder as payload
//! - anything else → unclassified

use regex::Regex;

/// Placeholder recorded for empty/non-text inbound messages.
pub const NON_TEXT_PLACEHOLDER: &str = "<non-text>";

/// Payload used when an order message carries no text after the keyword.
pub const EMPTY_ORDER_PAYLOAD: &str = "(no text)";

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Show the menu (0) or one numbered option (1–4).
    Menu(u8),
    /// Place an order with the given payload.
    Order(String),
    /// Free text the bot does not understand.
    Unclassified,
}

/// Compiled classification rules.
pub struct Classifier {
    greeting: Regex,
    order: Regex,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            greeting: Regex::new(r"(?i)\b(oi|ola|olá|menu|start|iniciar)\b").unwrap(),
            order: Regex::new(r"(?i)^pedido\b\s*[:\-]?\s*(.*)$").unwrap(),
        }
    }

    /// Normalize raw inbound text: trim, replace empty input with the
    /// non-text placeholder.
    pub fn normalize(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            NON_TEXT_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Classify normalized text. First match wins, case-insensitive.
    pub fn classify(&self, text: &str) -> Intent {
        if let Some(digit) = bare_menu_digit(text) {
            return Intent::Menu(digit);
        }
        if self.greeting.is_match(text) {
            return Intent::Menu(0);
        }
        if let Some(caps) = self.order.captures(text) {
            let payload = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let payload = if payload.is_empty() {
                EMPTY_ORDER_PAYLOAD.to_string()
            } else {
                payload.to_string()
            };
            return Intent::Order(payload);
        }
        Intent::Unclassified
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A message that is exactly one of the menu digits.
fn bare_menu_digit(text: &str) -> Option<u8> {
    match text {
        "1" => Some(1),
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_open_the_menu() {
        let c = Classifier::new();
        assert_eq!(c.classify("oi"), Intent::Menu(0));
        assert_eq!(c.classify("Olá, tudo bem?"), Intent::Menu(0));
        assert_eq!(c.classify("MENU"), Intent::Menu(0));
        assert_eq!(c.classify("start"), Intent::Menu(0));
    }

    #[test]
    fn bare_digits_select_options() {
        let c = Classifier::new();
        assert_eq!(c.classify("1"), Intent::Menu(1));
        assert_eq!(c.classify("4"), Intent::Menu(4));
        assert_eq!(c.classify("5"), Intent::Unclassified);
        assert_eq!(c.classify("12"), Intent::Unclassified);
    }

    #[test]
    fn order_keyword_captures_payload() {
        let c = Classifier::new();
        assert_eq!(
            c.classify("pedido: 2 temaki"),
            Intent::Order("2 temaki".into())
        );
        assert_eq!(
            c.classify("PEDIDO - 1 hot roll"),
            Intent::Order("1 hot roll".into())
        );
        assert_eq!(
            c.classify("pedido 3 uramaki"),
            Intent::Order("3 uramaki".into())
        );
    }

    #[test]
    fn bare_order_keyword_gets_placeholder_payload() {
        let c = Classifier::new();
        assert_eq!(c.classify("pedido:"), Intent::Order(EMPTY_ORDER_PAYLOAD.into()));
        assert_eq!(c.classify("pedido"), Intent::Order(EMPTY_ORDER_PAYLOAD.into()));
    }

    #[test]
    fn order_keyword_must_stand_alone() {
        let c = Classifier::new();
        assert_eq!(c.classify("pedidos antigos"), Intent::Unclassified);
    }

    #[test]
    fn free_text_is_unclassified() {
        let c = Classifier::new();
        assert_eq!(c.classify("xyz"), Intent::Unclassified);
        assert_eq!(c.classify("quero saber o horário"), Intent::Unclassified);
    }

    #[test]
    fn normalize_trims_and_fills_empty() {
        assert_eq!(Classifier::normalize("  oi  "), "oi");
        assert_eq!(Classifier::normalize("   "), NON_TEXT_PLACEHOLDER);
        assert_eq!(Classifier::normalize(""), NON_TEXT_PLACEHOLDER);
    }

    #[test]
    fn greeting_wins_over_order_keyword() {
        // Classification order: menu triggers are checked first.
        let c = Classifier::new();
        assert_eq!(c.classify("oi, pedido: 1 temaki"), Intent::Menu(0));
    }
}
