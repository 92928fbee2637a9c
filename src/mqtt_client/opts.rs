use rand::Rng;

/// Typed client configuration.
///
/// Build with [`MqttClientOptions::builder()`]; the defaults match the
/// public surface: a 20 second ping interval, 4096 byte read chunks, plain
/// TCP, no clean start, and a session that expires with the connection.
#[derive(Debug, Clone)]
pub struct MqttClientOptions {
    pub client_id: String,
    /// Seconds between keep-alive checks; PINGREQ is emitted every
    /// `ping_interval / 2` seconds while connected. 0 disables keep-alive.
    pub ping_interval: u16,
    /// Size of the inbound read chunks handed to the streaming decoder.
    pub max_buffer: usize,
    /// Connect over TLS instead of plain TCP.
    pub secure_connection: bool,
    /// Ask the broker to discard any prior session state.
    pub clean_start: bool,
    /// Session Expiry Interval in seconds; 0 means the session ends when the
    /// network connection closes.
    pub session_expiry: u32,
}

impl Default for MqttClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            ping_interval: 20,
            max_buffer: 4096,
            secure_connection: false,
            clean_start: false,
            session_expiry: 0,
        }
    }
}

impl MqttClientOptions {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Whether the broker is asked to keep session state across network
    /// connections.
    pub fn persistent_session(&self) -> bool {
        !self.clean_start && self.session_expiry > 0
    }
}

/// Fluent builder for [`MqttClientOptions`].
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: MqttClientOptions,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: MqttClientOptions::default(),
        }
    }

    /// Client identifier. Every `%` is replaced by two uppercase hex digits
    /// of one random byte, so `"sensor-%%"` yields e.g. `"sensor-3FA0"`.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.options.client_id = expand_client_id(&client_id.into());
        self
    }

    pub fn ping_interval(mut self, seconds: u16) -> Self {
        self.options.ping_interval = seconds;
        self
    }

    pub fn max_buffer(mut self, bytes: usize) -> Self {
        self.options.max_buffer = bytes;
        self
    }

    pub fn secure_connection(mut self, secure: bool) -> Self {
        self.options.secure_connection = secure;
        self
    }

    pub fn clean_start(mut self, clean_start: bool) -> Self {
        self.options.clean_start = clean_start;
        self
    }

    pub fn session_expiry(mut self, seconds: u32) -> Self {
        self.options.session_expiry = seconds;
        self
    }

    pub fn build(self) -> MqttClientOptions {
        self.options
    }
}

fn expand_client_id(template: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(template.len());
    for ch in template.chars() {
        if ch == '%' {
            let byte: u8 = rng.gen();
            out.push_str(&format!("{:02X}", byte));
        } else {
            out.push(ch);
        }
    }
    out
}
