use serde_json::{json, Map, Value};

/// The seven device kinds this runtime knows how to probe and command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Door,
    Cover,
    Shade,
    Fan,
    Light,
    Switch,
    Lock,
    Thermostat,
}

impl DeviceKind {
    /// The device-side service tag a command/state request is addressed to.
    pub fn service_tag(&self) -> &'static str {
        match self {
            DeviceKind::Door | DeviceKind::Cover => "pi.virtual.door",
            DeviceKind::Shade => "pi.virtual.shade",
            DeviceKind::Fan => "pi.virtual.fan",
            DeviceKind::Light => "pi.virtual.light",
            DeviceKind::Switch => "pi.virtual.switch",
            DeviceKind::Lock => "pi.virtual.lock",
            DeviceKind::Thermostat => "pi.virtual.thermostat",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            DeviceKind::Door | DeviceKind::Cover => "door",
            DeviceKind::Shade => "shade",
            DeviceKind::Fan => "fan",
            DeviceKind::Light => "light",
            DeviceKind::Switch => "switch",
            DeviceKind::Lock => "lock",
            DeviceKind::Thermostat => "thermostat",
        }
    }

    pub fn get_state_method(&self) -> String {
        format!("get_{}_state", self.noun())
    }

    pub fn set_state_method(&self) -> String {
        format!("transition_{}_state", self.noun())
    }
}

/// Arguments for a `transition_<device>_state` command. Every device kind
/// accepts `on_off`/`interruption_level`; thermostat additionally threads
/// `hvac_mode`/`preset_mode`/`reset`, matching the richer command surface
/// its service exposes over the simple binary devices.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    pub on_off: u8,
    pub interruption_level: Option<f64>,
    pub hvac_mode: Option<String>,
    pub preset_mode: Option<String>,
    pub reset: Option<bool>,
}

impl CommandArgs {
    pub fn on() -> Self {
        Self { on_off: 1, ..Default::default() }
    }

    pub fn off() -> Self {
        Self { on_off: 0, ..Default::default() }
    }
}

/// Builds the `{service_tag: {set_method: args}}` request envelope for a
/// command, following the shape `door_service.py`'s `handle` expects.
pub fn build_command_request(kind: DeviceKind, args: &CommandArgs) -> Value {
    let mut obj = Map::new();
    obj.insert("on_off".to_string(), json!(args.on_off));
    if let Some(level) = args.interruption_level {
        obj.insert("interruption_level".to_string(), json!(level));
    }
    if kind == DeviceKind::Thermostat {
        if let Some(mode) = &args.hvac_mode {
            obj.insert("hvac_mode".to_string(), json!(mode));
        }
        if let Some(mode) = &args.preset_mode {
            obj.insert("preset_mode".to_string(), json!(mode));
        }
        if let Some(reset) = args.reset {
            obj.insert("reset".to_string(), json!(reset));
        }
    }
    json!({ kind.service_tag(): { kind.set_state_method(): Value::Object(obj) } })
}

/// Builds a `get_<device>_state` request envelope.
pub fn build_state_request(kind: DeviceKind) -> Value {
    json!({ kind.service_tag(): { kind.get_state_method(): Value::Null } })
}

/// Builds the `system.get_sysinfo` request envelope, common to every kind.
pub fn build_sysinfo_request() -> Value {
    json!({ "system": { "get_sysinfo": Value::Null } })
}

/// Classifies a `get_sysinfo` response's `type` field into the
/// [`DeviceKind`] it names, matching the `"type"` string each service in
/// the original stub directory reports (`"door"`, `"fan"`, `"light"`,
/// `"lock"`, `"shade"`, `"switch"`, `"thermostat"`; `"cover"` accepted as a
/// synonym for `"door"` since both share a service tag). Returns `None` for
/// a type this runtime doesn't know how to drive.
pub fn classify_sysinfo(response: &Value) -> Option<DeviceKind> {
    let device_type = response.get("system")?.get("get_sysinfo")?.get("type")?.as_str()?;
    Some(match device_type {
        "door" => DeviceKind::Door,
        "cover" => DeviceKind::Cover,
        "shade" => DeviceKind::Shade,
        "fan" => DeviceKind::Fan,
        "light" => DeviceKind::Light,
        "switch" => DeviceKind::Switch,
        "lock" => DeviceKind::Lock,
        "thermostat" => DeviceKind::Thermostat,
        _ => return None,
    })
}

/// Whether a state response represents a terminal (non-transitioning)
/// state: no truthy `opening`/`closing`/`transitioning` flag. Exposed as a
/// free function rather than baked into the table so callers can supply a
/// device-specific override without touching the runtime.
pub fn is_terminal_state(state: &Value) -> bool {
    ["opening", "closing", "transitioning"]
        .iter()
        .all(|flag| !state.get(*flag).and_then(Value::as_bool).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_and_cover_share_a_service_tag() {
        assert_eq!(DeviceKind::Door.service_tag(), DeviceKind::Cover.service_tag());
    }

    #[test]
    fn thermostat_command_carries_hvac_fields() {
        let args = CommandArgs { hvac_mode: Some("heat".to_string()), ..CommandArgs::on() };
        let req = build_command_request(DeviceKind::Thermostat, &args);
        assert_eq!(
            req["pi.virtual.thermostat"]["transition_thermostat_state"]["hvac_mode"],
            "heat"
        );
    }

    #[test]
    fn simple_device_command_omits_thermostat_fields() {
        let req = build_command_request(DeviceKind::Fan, &CommandArgs::on());
        assert!(req["pi.virtual.fan"]["transition_fan_state"]
            .get("hvac_mode")
            .is_none());
    }

    #[test]
    fn terminal_state_detection() {
        assert!(is_terminal_state(&json!({"closed": true})));
        assert!(!is_terminal_state(&json!({"opening": true})));
        assert!(!is_terminal_state(&json!({"closing": true})));
    }

    #[test]
    fn classify_sysinfo_recognizes_every_known_type() {
        for (type_str, kind) in [
            ("door", DeviceKind::Door),
            ("cover", DeviceKind::Cover),
            ("shade", DeviceKind::Shade),
            ("fan", DeviceKind::Fan),
            ("light", DeviceKind::Light),
            ("switch", DeviceKind::Switch),
            ("lock", DeviceKind::Lock),
            ("thermostat", DeviceKind::Thermostat),
        ] {
            let resp = json!({"system": {"get_sysinfo": {"type": type_str, "model": "x"}}});
            assert_eq!(classify_sysinfo(&resp), Some(kind));
        }
    }

    #[test]
    fn classify_sysinfo_rejects_unknown_types() {
        let resp = json!({"system": {"get_sysinfo": {"type": "elevator"}}});
        assert_eq!(classify_sysinfo(&resp), None);
    }
}
