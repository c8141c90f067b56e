//! Shopping-assistant chat state container.
//!
//! # Invariants
//! - Blank input is ignored and publishes nothing.
//! - The user message is appended before the assistant is called; a failed
//!   call keeps it and records the error.
//! - `is_waiting` is true only while a reply is outstanding.

use crate::model::product::Product;
use async_trait::async_trait;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter, Write as _};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub message: String,
}

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "chat assistant error: {}", self.message)
    }
}

impl Error for ChatError {}

/// Generative assistant backend.
#[async_trait]
pub trait ChatAssistant: Send + Sync {
    /// Produces the next assistant reply for `history`.
    async fn reply(&self, context: &str, history: &[ChatMessage]) -> Result<String, ChatError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub is_waiting: bool,
    pub error: Option<String>,
}

/// System prompt describing the store and its current catalog.
pub fn build_catalog_context(products: &[Product]) -> String {
    let mut context = String::from(
        "Eres el asistente de compras de un almacén en línea. \
         Responde en español, de forma breve, usando solo estos productos:\n",
    );
    for product in products {
        let _ = writeln!(
            context,
            "- {} ({}): ${} [{}]",
            product.name,
            product.category,
            product.price,
            if product.in_stock() { "disponible" } else { "agotado" }
        );
    }
    context
}

pub struct ChatState {
    assistant: Arc<dyn ChatAssistant>,
    context: String,
    state: watch::Sender<ChatSnapshot>,
}

impl ChatState {
    pub fn new(assistant: Arc<dyn ChatAssistant>, context: String) -> Self {
        let (state, _) = watch::channel(ChatSnapshot::default());
        Self {
            assistant,
            context,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    /// Replaces the catalog context used for later messages.
    pub fn set_context(&mut self, context: String) {
        self.context = context;
    }

    pub async fn send(&self, text: &str) -> ChatSnapshot {
        let text = text.trim();
        if text.is_empty() {
            return self.snapshot();
        }

        let mut history = Vec::new();
        self.state.send_modify(|chat| {
            chat.messages.push(ChatMessage::user(text));
            chat.is_waiting = true;
            chat.error = None;
            history = chat.messages.clone();
        });

        let reply = self.assistant.reply(&self.context, &history).await;
        self.state.send_modify(|chat| {
            chat.is_waiting = false;
            match reply {
                Ok(answer) => chat.messages.push(ChatMessage::assistant(answer)),
                Err(err) => {
                    warn!("event=chat_reply module=state status=error error={}", err);
                    chat.error = Some("El asistente no está disponible.".to_string());
                }
            }
        });
        self.snapshot()
    }

    pub fn clear(&self) {
        self.state.send_replace(ChatSnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use super::{build_catalog_context, ChatAssistant, ChatError, ChatMessage, ChatRole, ChatState};
    use crate::model::product::Product;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    struct EchoAssistant;

    #[async_trait]
    impl ChatAssistant for EchoAssistant {
        async fn reply(&self, _context: &str, history: &[ChatMessage]) -> Result<String, ChatError> {
            match history.last() {
                Some(message) if message.text == "falla" => Err(ChatError::new("quota")),
                Some(message) => Ok(format!("eco: {}", message.text)),
                None => Ok(String::new()),
            }
        }
    }

    #[tokio::test]
    async fn send_appends_user_and_assistant_messages() {
        let chat = ChatState::new(Arc::new(EchoAssistant), String::new());
        let snapshot = chat.send(" hola ").await;
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].text, "hola");
        assert_eq!(snapshot.messages[1].role, ChatRole::Assistant);
        assert!(!snapshot.is_waiting);
    }

    #[tokio::test]
    async fn blank_input_is_ignored_and_errors_are_recorded() {
        let chat = ChatState::new(Arc::new(EchoAssistant), String::new());
        assert!(chat.send("   ").await.messages.is_empty());

        let snapshot = chat.send("falla").await;
        assert_eq!(snapshot.messages.len(), 1);
        assert!(snapshot.error.is_some());

        chat.clear();
        assert!(chat.snapshot().messages.is_empty());
    }

    #[test]
    fn catalog_context_lists_products() {
        let mut bread = Product::new(6, "PAN-001", "Marraqueta", "Panadería", Decimal::from(2500));
        bread.stock = 0;
        let context = build_catalog_context(&[bread]);
        assert!(context.contains("- Marraqueta (Panadería): $2500 [agotado]"));
    }
}
