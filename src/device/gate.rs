//! Correlation gate - decides whether a delivered message is the expected
//! trigger and produces the correlated response.
//!
//! # Trigger decision
//!
//! | topic condition | message mask | satisfied when                   |
//! |-----------------|--------------|----------------------------------|
//! | set             | set          | topic equal **and** payload fits |
//! | set             | -            | topic equal                      |
//! | -               | set          | payload fits                     |
//! | -               | -            | always                           |
//!
//! "Payload fits" is JSON equality when the mask has no placeholders, and a
//! successful mask match (strict or not, per configuration) otherwise.
//!
//! # Response
//!
//! ```text
//! delivered ──► evaluate ──► [delay] ──► substitute ──► publish ──► latch.mark()
//!                  │
//!                  └── unmatched: nothing happens
//! ```
//!
//! The delay is awaited inside the calling worker, so the next delivery for
//! the same device waits until the response is out. Other devices are not
//! affected.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::mqtt::{compact_payload, Publisher};
use crate::parser::{contains_placeholders, match_mask, substitute, ParamBinding};

use super::config::DeviceConfig;
use super::error::DeviceError;
use super::latch::Latch;
use super::mode::Mode;

/// Outcome of one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The device does not listen in its current mode
    Ignored,
    /// Not the expected message
    Unmatched,
    /// Expected message recorded, no response configured
    Observed,
    /// Expected message recorded and answered
    Responded { topic: String, payload: Value },
}

pub struct CorrelationGate {
    config: Arc<DeviceConfig>,
    latch: Arc<Latch>,
    mask_has_placeholders: bool,
    template_has_placeholders: bool,
}

impl CorrelationGate {
    pub fn new(config: Arc<DeviceConfig>, latch: Arc<Latch>) -> Self {
        let mask_has_placeholders = config
            .subscribe_message_mask()
            .is_some_and(contains_placeholders);
        let template_has_placeholders = config
            .publish_payload_template()
            .is_some_and(contains_placeholders);

        Self {
            config,
            latch,
            mask_has_placeholders,
            template_has_placeholders,
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Checks the trigger conditions.
    ///
    /// Returns the extracted parameters when the message is the expected one
    /// (empty when the mask has no placeholders or there is no mask).
    pub fn evaluate(&self, topic: &str, payload: &str) -> Option<ParamBinding> {
        if let Some(expected_topic) = self.config.subscribe_topic_condition() {
            if expected_topic != topic {
                debug!(
                    "{}: topic {} does not match condition {}",
                    self.config.name(),
                    topic,
                    expected_topic
                );
                return None;
            }
        }

        match self.config.subscribe_message_mask() {
            Some(mask) => self.match_payload(mask, payload),
            None => Some(ParamBinding::new()),
        }
    }

    fn match_payload(&self, mask: &Value, payload: &str) -> Option<ParamBinding> {
        let subject: Value = match serde_json::from_str(payload) {
            Ok(subject) => subject,
            Err(e) => {
                warn!(
                    "{}: payload is not JSON, cannot compare with mask: {}",
                    self.config.name(),
                    e
                );
                return None;
            }
        };

        if !self.mask_has_placeholders {
            return (mask == &subject).then(ParamBinding::new);
        }

        match match_mask(mask, &subject, self.config.strict_match()) {
            Ok(binding) => Some(binding),
            Err(e) => {
                debug!("{}: {}", self.config.name(), e);
                None
            }
        }
    }

    /// Handles one delivered message.
    ///
    /// The latch is marked once the message is fully processed, including the
    /// delay and the publication attempt. A failed publication still marks it
    /// and is reported as [`DeviceError::PublicationFailed`].
    pub async fn deliver<P: Publisher + ?Sized>(
        &self,
        topic: &str,
        payload: &str,
        publisher: &P,
    ) -> Result<Delivery, DeviceError> {
        let name = self.config.name();
        let mode = self.mode();
        if !mode.subscribes() {
            debug!("{}: ignoring message on {} in {} mode", name, topic, mode);
            return Ok(Delivery::Ignored);
        }

        let Some(binding) = self.evaluate(topic, payload) else {
            warn!(
                "{}: not handled message {} received on topic {}",
                name,
                compact_payload(payload),
                topic
            );
            return Ok(Delivery::Unmatched);
        };
        info!(
            "{}: subscribed on topic {}, has received the message {}",
            name,
            topic,
            compact_payload(payload)
        );

        let (Some(publish_topic), Some(template)) = (
            self.config.publish_topic(),
            self.config.publish_payload_template(),
        ) else {
            self.latch.mark();
            return Ok(Delivery::Observed);
        };

        let delay = self.config.response_delay();
        if !delay.is_zero() {
            debug!("{}: waiting {:?} before responding", name, delay);
            tokio::time::sleep(delay).await;
        }

        let outgoing = if self.mask_has_placeholders {
            substitute(template, &binding)
        } else {
            template.clone()
        };
        let text = outgoing.to_string();
        let result = publisher.publish(publish_topic, &text);
        self.latch.mark();

        match result {
            Ok(()) => {
                info!("{}: message {} published to topic {}", name, text, publish_topic);
                Ok(Delivery::Responded {
                    topic: publish_topic.to_string(),
                    payload: outgoing,
                })
            }
            Err(e) => {
                error!("{}: {}", name, e);
                Err(DeviceError::PublicationFailed(e))
            }
        }
    }

    /// True iff a publication is configured and its template is complete.
    pub fn can_publish_on_demand(&self) -> bool {
        self.mode().publishes() && !self.template_has_placeholders
    }

    /// Topic and payload an on-demand publication would send.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NothingToPublish`] without a configured publication,
    /// [`DeviceError::UnresolvedTemplate`] if the template has placeholders.
    pub fn on_demand_publication(&self) -> Result<(&str, &Value), DeviceError> {
        let name = self.config.name();
        let (Some(topic), Some(template)) = (
            self.config.publish_topic(),
            self.config.publish_payload_template(),
        ) else {
            return Err(DeviceError::NothingToPublish(name.to_string()));
        };
        if self.template_has_placeholders {
            return Err(DeviceError::UnresolvedTemplate(name.to_string()));
        }
        Ok((topic, template))
    }

    /// Publishes the template as-is, outside the reactive path.
    pub fn publish_on_demand<P: Publisher + ?Sized>(&self, publisher: &P) -> Result<(), DeviceError> {
        let (topic, template) = self.on_demand_publication()?;
        let text = template.to_string();
        publisher.publish(topic, &text)?;
        info!(
            "{}: publishing message {} on topic {}",
            self.config.name(),
            text,
            topic
        );
        Ok(())
    }
}
