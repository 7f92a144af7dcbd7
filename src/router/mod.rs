//! Inbound message router.
//!
//! Stateless between calls: normalize the text, upsert the contact,
//! classify, act, and render exactly one reply string per inbound message
//! — never zero, never more than one.

pub mod rules;

use std::sync::Arc;

use tracing::info;

use crate::contacts::ContactDirectory;
use crate::error::Result;
use crate::events::{DomainEvent, EventBus};
use crate::orders::Order;
use crate::promo::{PromoContent, PromoProvider};
use crate::router::rules::{Classifier, Intent};
use crate::store::Store;

pub struct MessageRouter {
    directory: Arc<ContactDirectory>,
    store: Arc<dyn Store>,
    bus: EventBus,
    promo: Arc<dyn PromoProvider>,
    classifier: Classifier,
}

impl MessageRouter {
    pub fn new(
        directory: Arc<ContactDirectory>,
        store: Arc<dyn Store>,
        bus: EventBus,
        promo: Arc<dyn PromoProvider>,
    ) -> Self {
        Self {
            directory,
            store,
            bus,
            promo,
            classifier: Classifier::new(),
        }
    }

    /// Handle one inbound message and return the single reply to send.
    pub async fn handle_inbound(
        &self,
        sender_id: &str,
        raw_text: &str,
        display_name_hint: &str,
    ) -> Result<String> {
        let text = Classifier::normalize(raw_text);
        self.directory
            .upsert(sender_id, display_name_hint, &text)
            .await?;

        let reply = match self.classifier.classify(&text) {
            Intent::Menu(option) => {
                let promo = self.promo.current().await;
                render_menu(option, &promo)
            }
            Intent::Order(payload) => {
                let order = Order::new(sender_id, payload.clone());
                self.store.insert_order(&order).await?;
                info!(order_id = %order.id, contact_id = %sender_id, "Order received");
                self.bus.publish(DomainEvent::OrderReceived(order));
                render_order_ack(&payload)
            }
            Intent::Unclassified => render_fallback(),
        };

        Ok(reply)
    }
}

/// Render the menu reply for option 0 (full menu) or 1–4 (detail).
fn render_menu(option: u8, promo: &PromoContent) -> String {
    match option {
        1 => format!("🍱 Cardápio: {}", promo.catalog_link),
        2 => format!("🔥 Promoção do Dia:\n{}", promo.body_text),
        3 => "Envie seu pedido no formato:\nPEDIDO: ...\nENDEREÇO: ...\nPAGAMENTO: ...".to_string(),
        4 => "👤 Certo! Um atendente vai continuar esta conversa em instantes.".to_string(),
        _ => {
            let link = format!("🔗 Cardápio: {}", promo.catalog_link);
            [
                "🥢 *Bem-vindo!*",
                "",
                "Escolha uma opção:",
                "1️⃣ Cardápio",
                "2️⃣ Promoção do dia",
                "3️⃣ Fazer pedido",
                "4️⃣ Falar com atendente",
                "",
                link.as_str(),
            ]
            .join("\n")
        }
    }
}

fn render_order_ack(payload: &str) -> String {
    format!("✅ Pedido recebido! Em instantes confirmamos.\n📝 {payload}")
}

fn render_fallback() -> String {
    "❓ Não entendi. Digite \"menu\" para ver as opções ou envie PEDIDO: seguido do seu pedido."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promo::StaticPromo;
    use crate::store::LibSqlStore;

    struct Harness {
        router: MessageRouter,
        store: Arc<dyn Store>,
        bus: EventBus,
    }

    async fn harness() -> Harness {
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let bus = EventBus::new();
        let directory = Arc::new(ContactDirectory::new(Arc::clone(&store), bus.clone(), 20));
        let promo = Arc::new(StaticPromo::new(PromoContent {
            body_text: "Compre 1 temaki e leve um suco".into(),
            catalog_link: "https://example.com/menu".into(),
        }));

        let router = MessageRouter::new(directory, Arc::clone(&store), bus.clone(), promo);
        Harness { router, store, bus }
    }

    #[tokio::test]
    async fn menu_reply_lists_all_four_options() {
        let h = harness().await;
        let reply = h.router.handle_inbound("c1", "menu", "Maria").await.unwrap();

        for marker in ["1️⃣", "2️⃣", "3️⃣", "4️⃣"] {
            assert!(reply.contains(marker), "missing option marker {marker}");
        }
        assert!(reply.contains("https://example.com/menu"));
    }

    #[tokio::test]
    async fn greeting_shows_menu_too() {
        let h = harness().await;
        let reply = h.router.handle_inbound("c1", "Olá!", "Maria").await.unwrap();
        assert!(reply.contains("Escolha uma opção"));
    }

    #[tokio::test]
    async fn digit_replies_render_details() {
        let h = harness().await;

        let catalog = h.router.handle_inbound("c1", "1", "Maria").await.unwrap();
        assert!(catalog.contains("https://example.com/menu"));

        let promo = h.router.handle_inbound("c1", "2", "Maria").await.unwrap();
        assert!(promo.contains("Compre 1 temaki e leve um suco"));

        let instructions = h.router.handle_inbound("c1", "3", "Maria").await.unwrap();
        assert!(instructions.contains("PEDIDO:"));

        let handoff = h.router.handle_inbound("c1", "4", "Maria").await.unwrap();
        assert!(handoff.contains("atendente"));
    }

    #[tokio::test]
    async fn order_is_persisted_published_and_acknowledged() {
        let h = harness().await;
        let mut rx = h.bus.subscribe();

        let reply = h
            .router
            .handle_inbound("c1", "pedido: 2 temaki", "Maria")
            .await
            .unwrap();
        assert!(reply.contains("2 temaki"));

        let orders = h.store.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].text, "2 temaki");
        assert_eq!(orders[0].contact_id, "c1");

        // LeadUpdated from the upsert, then OrderReceived.
        let mut saw_order = false;
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::OrderReceived(order) = event {
                assert_eq!(order.text, "2 temaki");
                saw_order = true;
            }
        }
        assert!(saw_order);
    }

    #[tokio::test]
    async fn free_text_gets_the_fallback() {
        let h = harness().await;
        let reply = h.router.handle_inbound("c1", "xyz", "Maria").await.unwrap();
        assert!(reply.contains("menu"));
        assert!(reply.contains("PEDIDO"));
    }

    #[tokio::test]
    async fn every_inbound_message_updates_the_contact() {
        let h = harness().await;
        h.router.handle_inbound("c1", "oi", "Maria").await.unwrap();
        h.router.handle_inbound("c1", "xyz", "").await.unwrap();

        let contact = h.store.get_contact("c1").await.unwrap().unwrap();
        assert_eq!(contact.display_name, "Maria");
        assert_eq!(contact.history.len(), 2);
    }

    #[tokio::test]
    async fn non_text_input_is_recorded_as_placeholder() {
        let h = harness().await;
        let reply = h.router.handle_inbound("c1", "   ", "Maria").await.unwrap();
        assert!(reply.contains("Não entendi"));

        let contact = h.store.get_contact("c1").await.unwrap().unwrap();
        assert_eq!(contact.history[0].text, rules::NON_TEXT_PLACEHOLDER);
    }
}
