//! Kitchen display WebSocket protocol
//!
//! Server → Display: DisplayMessage (推送)
//! Display → Server: DisplayCommand

use serde::{Deserialize, Serialize};

use super::event::KitchenEvent;
use super::order::KitchenOrder;

/// Server → Display push message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DisplayMessage {
    /// 加入厨房后的全量快照，也用于 Resync 与 lag 恢复
    Ready { orders: Vec<KitchenOrder> },
    /// 单个变更事件
    Event { event: KitchenEvent },
}

/// Display → Server command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DisplayCommand {
    /// Ask for a fresh `Ready` snapshot
    Resync,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let ready = serde_json::to_value(DisplayMessage::Ready { orders: vec![] }).unwrap();
        assert_eq!(ready["type"], "Ready");
        assert!(ready["orders"].as_array().unwrap().is_empty());

        let event = DisplayMessage::Event {
            event: KitchenEvent::OrderDeleted { order_id: 4 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"]["type"], "OrderDeleted");
        assert_eq!(json["event"]["orderId"], 4);
    }

    #[test]
    fn test_command_parse() {
        let cmd: DisplayCommand = serde_json::from_str(r#"{"type":"Resync"}"#).unwrap();
        assert_eq!(cmd, DisplayCommand::Resync);
        assert!(serde_json::from_str::<DisplayCommand>(r#"{"type":"Bogus"}"#).is_err());
    }
}
