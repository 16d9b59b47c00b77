pub fn wrap_twiml(twiml: String) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{twiml}")
}

mod twiml {
    use xmlserde_derives::XmlSerialize;

    #[derive(PartialEq, Eq, XmlSerialize)]
    #[xmlserde(root = b"Response")]
    pub struct Response {
        #[xmlserde(ty = "untag")]
        pub actions: Vec<ResponseAction>,
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub enum ResponseAction {
        #[xmlserde(name = b"Say")]
        Say(SayAction),
        #[xmlserde(name = b"Record")]
        Record(RecordAction),
        #[xmlserde(name = b"Hangup")]
        Hangup(HangupAction),
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct SayAction {
        #[xmlserde(ty = "text")]
        pub text: String,
        #[xmlserde(name = b"voice", ty = "attr")]
        pub voice: Option<String>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct RecordAction {
        #[xmlserde(name = b"maxLength", ty = "attr")]
        pub max_length: Option<u16>,
        // Twilio reads these as the literal strings "true"/"false"
        #[xmlserde(name = b"playBeep", ty = "attr")]
        pub play_beep: Option<String>,
        #[xmlserde(name = b"transcribe", ty = "attr")]
        pub transcribe: Option<String>,
        #[xmlserde(name = b"transcribeCallback", ty = "attr")]
        pub transcribe_callback: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct HangupAction {
        // Hangup carries no attributes; xmlserde still wants a field
        #[xmlserde(ty = "text")]
        pub text: String,
    }
}
pub use twiml::*;

mod webhook {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "kebab-case")]
    pub enum CallStatus {
        Queued,
        Ringing,
        InProgress,
        Completed,
        Busy,
        Failed,
        NoAnswer,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "kebab-case")]
    pub enum CallDirection {
        Inbound,
        OutboundApi,
        OutboundDial,
    }

    /// Inbound-voice webhook body.  Twilio posts this url-encoded when a call
    /// reaches the number.
    #[allow(dead_code)]
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct TwilioVoicePayload {
        pub account_sid: String,
        pub api_version: String,
        pub call_sid: String,
        pub call_status: CallStatus,
        pub called: String,
        pub caller: Option<String>,
        pub direction: CallDirection,
        pub from: String,
        pub from_city: Option<String>,
        pub from_country: Option<String>,
        pub from_state: Option<String>,
        pub from_zip: Option<String>,
        pub to: String,
    }

    /// Call-status callback; `CallDuration` is only present once the call has
    /// completed.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct TwilioStatusPayload {
        pub call_sid: String,
        pub call_status: CallStatus,
        pub call_duration: Option<String>,
    }

    /// Async transcription callback fired after a Record verb.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct TwilioTranscriptionPayload {
        pub call_sid: String,
        pub transcription_status: String,
        pub transcription_text: Option<String>,
    }
}
pub use webhook::*;

mod messages {
    use serde::Deserialize;

    /// The slice of the Messages API response we care about.
    #[derive(Deserialize, Debug)]
    pub struct TwilioMessageResponse {
        pub sid: String,
        pub status: Option<String>,
    }
}
pub use messages::*;
