pub mod misc;

use channel_shared::op;

use crate::client::ChannelClient;
use crate::handler::HandlerDescriptor;

/// Every handler the channel server ships with. Loaded once at startup by
/// [`HandlerRegistry::from_table`](crate::handler::HandlerRegistry::from_table);
/// rows later in the list win when two rows share an op.
pub fn channel_handlers() -> Vec<HandlerDescriptor<ChannelClient>> {
    vec![
        HandlerDescriptor::function(
            "misc::mails_request",
            &[op::MAILS_REQUEST],
            misc::mails_request,
        ),
        HandlerDescriptor::function(
            "misc::sos_button_request",
            &[op::SOS_BUTTON_REQUEST],
            misc::sos_button_request,
        ),
        HandlerDescriptor::function(
            "misc::moon_gate_info_request",
            &[op::MOON_GATE_INFO_REQUEST],
            misc::moon_gate_info_request,
        ),
        HandlerDescriptor::object(
            "misc::HomesteadInfoHandler",
            &[op::HOMESTEAD_INFO_REQUEST],
            misc::HomesteadInfoHandler::shared,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerRegistry;

    #[test]
    fn table_covers_every_request() {
        let registry = HandlerRegistry::from_table(&channel_handlers());
        let mut expected = vec![
            op::MAILS_REQUEST,
            op::SOS_BUTTON_REQUEST,
            op::MOON_GATE_INFO_REQUEST,
            op::HOMESTEAD_INFO_REQUEST,
        ];
        expected.sort_unstable();
        assert_eq!(registry.ops(), expected);
        assert!(!registry.contains(0x5000));
    }
}
