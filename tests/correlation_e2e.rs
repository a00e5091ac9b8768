//! End-to-end correlation: delivered message -> gate -> published response.
//!
//! Uses a recording publisher in place of the broker.

use std::sync::{Arc, Mutex};

use iotsim::device::{CorrelationGate, Delivery, DeviceConfig, DeviceSettings, Latch, Mode};
use iotsim::mqtt::{Publisher, TransportError};
use serde_json::{json, Value};

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(String, Value)>>,
}

impl Recorder {
    fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl Publisher for Recorder {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let value = serde_json::from_str(payload)
            .map_err(|e| TransportError::new(topic, format!("not JSON: {e}")))?;
        self.sent.lock().unwrap().push((topic.to_string(), value));
        Ok(())
    }
}

fn thermostat() -> (CorrelationGate, Arc<Latch>) {
    let config = DeviceConfig::try_from(DeviceSettings {
        name: Some("thermostat".into()),
        subscription_topic: Some("home/+/set".into()),
        topic_condition: Some("home/thermostat/set".into()),
        message_mask: Some(
            r#"{"request": "{req}", "target": {"celsius": "{temp}", "eco": "{eco}"}}"#.into(),
        ),
        publish_topic: Some("home/thermostat/state".into()),
        publish_payload: Some(
            r#"{"request": "{req}", "state": {"celsius": "{temp}", "eco": "{eco}", "mode": "{mode}"}}"#
                .into(),
        ),
        ..Default::default()
    })
    .unwrap();
    let latch = Arc::new(Latch::new());
    (CorrelationGate::new(Arc::new(config), latch.clone()), latch)
}

#[tokio::test]
async fn responds_with_typed_values_from_trigger() {
    let (gate, latch) = thermostat();
    assert_eq!(gate.mode(), Mode::RequestResponse);
    assert!(!gate.can_publish_on_demand());
    let recorder = Recorder::default();

    let delivery = gate
        .deliver(
            "home/thermostat/set",
            r#"{"request": "r-17", "target": {"celsius": 21.5, "eco": false}, "source": "app"}"#,
            &recorder,
        )
        .await
        .unwrap();
    assert!(matches!(delivery, Delivery::Responded { .. }));

    let sent = recorder.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "home/thermostat/state");
    assert_eq!(
        sent[0].1,
        json!({"request": "r-17", "state": {"celsius": 21.5, "eco": false, "mode": "{mode}"}})
    );
    assert!(latch.consume());
}

#[tokio::test]
async fn ignores_wrong_topic_and_wrong_shape() {
    let (gate, latch) = thermostat();
    let recorder = Recorder::default();

    let trigger = r#"{"request": "r-1", "target": {"celsius": 20, "eco": true}}"#;
    let wrong_topic = gate.deliver("home/boiler/set", trigger, &recorder).await.unwrap();
    let wrong_shape = gate
        .deliver("home/thermostat/set", r#"{"request": "r-1", "target": 20}"#, &recorder)
        .await
        .unwrap();
    let null_value = gate
        .deliver(
            "home/thermostat/set",
            r#"{"request": null, "target": {"celsius": 20, "eco": true}}"#,
            &recorder,
        )
        .await
        .unwrap();

    assert_eq!(wrong_topic, Delivery::Unmatched);
    assert_eq!(wrong_shape, Delivery::Unmatched);
    assert_eq!(null_value, Delivery::Unmatched);
    assert!(recorder.take().is_empty());
    assert!(!latch.consume());
}

#[tokio::test]
async fn latch_reports_two_deliveries_once() {
    let (gate, latch) = thermostat();
    let recorder = Recorder::default();
    let trigger = r#"{"request": "r-2", "target": {"celsius": 19, "eco": true}}"#;

    gate.deliver("home/thermostat/set", trigger, &recorder).await.unwrap();
    gate.deliver("home/thermostat/set", trigger, &recorder).await.unwrap();

    assert_eq!(recorder.take().len(), 2);
    assert!(latch.consume());
    assert!(!latch.consume());
}

#[tokio::test]
async fn independent_devices_do_not_share_state() {
    let (first, first_latch) = thermostat();
    let (_second, second_latch) = thermostat();
    let recorder = Recorder::default();

    first
        .deliver(
            "home/thermostat/set",
            r#"{"request": "r-3", "target": {"celsius": 18, "eco": false}}"#,
            &recorder,
        )
        .await
        .unwrap();

    assert!(first_latch.consume());
    assert!(!second_latch.consume());
}
