use channel_shared::Packet;
use std::sync::Arc;

use crate::client::ChannelClient;
use crate::handler::{HandlerResult, PacketHandler};
use crate::send;

/// Sent on login to request the list of new mails.
///
/// No parameters.
pub fn mails_request(client: &ChannelClient, packet: &Packet) -> HandlerResult {
    let Some(creature) = client.get_creature(packet.id()) else {
        return Ok(());
    };

    send::mails_request_r(client, &creature);
    Ok(())
}

/// Sent on login; the answer decides whether the SOS button is shown.
///
/// No parameters.
pub fn sos_button_request(client: &ChannelClient, packet: &Packet) -> HandlerResult {
    let Some(creature) = client.get_creature(packet.id()) else {
        return Ok(());
    };

    // Disabled until rescue requests are implemented.
    send::sos_button_request_r(client, &creature, false);
    Ok(())
}

/// Sent periodically to request the current moon gates.
///
/// No parameters.
pub fn moon_gate_info_request(client: &ChannelClient, packet: &Packet) -> HandlerResult {
    let Some(creature) = client.get_creature(packet.id()) else {
        return Ok(());
    };

    send::moon_gate_info_request_r(client, &creature);
    Ok(())
}

/// Sent on login to get homestead information.
///
/// ```text
/// 001 [..............00] Byte   : 0
/// ```
#[derive(Debug, Default)]
pub struct HomesteadInfoHandler;

impl HomesteadInfoHandler {
    pub fn shared() -> Arc<dyn PacketHandler<ChannelClient>> {
        Arc::new(Self)
    }
}

impl PacketHandler<ChannelClient> for HomesteadInfoHandler {
    fn handle(&self, client: &ChannelClient, packet: &Packet) -> HandlerResult {
        let _unk = packet.reader().get_byte()?;

        let Some(creature) = client.get_creature(packet.id()) else {
            return Ok(());
        };

        send::homestead_info_request_r(client, &creature);
        Ok(())
    }
}
