use channel_shared::{op, Packet};

use crate::client::ChannelClient;
use crate::world::PlayerCreature;

/// Tells a freshly connected client which creature it controls.
pub fn channel_welcome(client: &ChannelClient, creature: &PlayerCreature) {
    let packet = Packet::builder(op::CHANNEL_WELCOME, creature.entity_id)
        .long(creature.entity_id)
        .int(creature.region_id)
        .string(creature.name.as_str())
        .build();
    client.send(packet);
}

/// Mail list. Always empty for now.
pub fn mails_request_r(client: &ChannelClient, creature: &PlayerCreature) {
    client.send(Packet::new(op::MAILS_REQUEST_R, creature.entity_id));
}

pub fn sos_button_request_r(client: &ChannelClient, creature: &PlayerCreature, enabled: bool) {
    let packet = Packet::builder(op::SOS_BUTTON_REQUEST_R, creature.entity_id)
        .byte(u8::from(enabled))
        .build();
    client.send(packet);
}

pub fn homestead_info_request_r(client: &ChannelClient, creature: &PlayerCreature) {
    let packet = Packet::builder(op::HOMESTEAD_INFO_REQUEST_R, creature.entity_id)
        .byte(0)
        .byte(0)
        .byte(1)
        .build();
    client.send(packet);
}

/// Moon gate list. Always empty for now.
pub fn moon_gate_info_request_r(client: &ChannelClient, creature: &PlayerCreature) {
    client.send(Packet::new(op::MOON_GATE_INFO_REQUEST_R, creature.entity_id));
}
