/// Server -> client greeting; carries the controlled entity and its region.
pub const CHANNEL_WELCOME: u32 = 0x0001;

pub const MAILS_REQUEST: u32 = 0x7255;
pub const MAILS_REQUEST_R: u32 = 0x7256;

pub const SOS_BUTTON_REQUEST: u32 = 0xA9A3;
pub const SOS_BUTTON_REQUEST_R: u32 = 0xA9A4;

pub const HOMESTEAD_INFO_REQUEST: u32 = 0x9A7C;
pub const HOMESTEAD_INFO_REQUEST_R: u32 = 0x9A7D;

pub const MOON_GATE_INFO_REQUEST: u32 = 0xA8B1;
pub const MOON_GATE_INFO_REQUEST_R: u32 = 0xA8B2;

/// Human-readable name of an operation code, for logs.
pub fn name(op: u32) -> Option<&'static str> {
    let name = match op {
        CHANNEL_WELCOME => "ChannelWelcome",
        MAILS_REQUEST => "MailsRequest",
        MAILS_REQUEST_R => "MailsRequestR",
        SOS_BUTTON_REQUEST => "SosButtonRequest",
        SOS_BUTTON_REQUEST_R => "SosButtonRequestR",
        HOMESTEAD_INFO_REQUEST => "HomesteadInfoRequest",
        HOMESTEAD_INFO_REQUEST_R => "HomesteadInfoRequestR",
        MOON_GATE_INFO_REQUEST => "MoonGateInfoRequest",
        MOON_GATE_INFO_REQUEST_R => "MoonGateInfoRequestR",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_names() {
        assert_eq!(name(MAILS_REQUEST), Some("MailsRequest"));
        assert_eq!(name(0x5000), None);
    }
}
