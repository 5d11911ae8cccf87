//! Best-effort device fingerprinting and player routing for head-to-head play.
//!
//! The host never hands out a real device identifier, so a fingerprint is
//! built from whatever the platform leaks: keyboard region, platform class,
//! touch capability and an optional touch-origin hint. Two physical keyboards
//! of the same kind in the same region collide, and a flaky capability probe
//! can split one keyboard into two fingerprints. Routing is only as good as
//! that heuristic.

use crate::keys::{KeyLocation, RawKeyEvent};
use crate::player::PlayerSlot;
use itertools::Itertools;
use log::{debug, info};
use regex::Regex;
use std::sync::LazyLock;

static ANDROID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Android").expect("static regex is valid"));
static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Mobile").expect("static regex is valid"));
static IPHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iPhone").expect("static regex is valid"));
static IPAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iPad|iPadOS").expect("static regex is valid"));
static DESKTOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Macintosh|Windows|Linux|CrOS").expect("static regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlatformCategory {
    Mobile,
    Tablet,
    Desktop,
    #[default]
    Unknown,
}

/// Classify a user-agent style string. Anything unrecognised is `Unknown`.
pub fn classify_user_agent(user_agent: &str) -> PlatformCategory {
    if ANDROID.is_match(user_agent) {
        if MOBILE.is_match(user_agent) {
            PlatformCategory::Mobile
        } else {
            PlatformCategory::Tablet
        }
    } else if IPHONE.is_match(user_agent) {
        PlatformCategory::Mobile
    } else if IPAD.is_match(user_agent) {
        PlatformCategory::Tablet
    } else if DESKTOP.is_match(user_agent) {
        PlatformCategory::Desktop
    } else {
        PlatformCategory::Unknown
    }
}

/// What a capability probe could find out about the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub touch_capable: bool,
    pub platform_category: PlatformCategory,
    pub platform: String,
}

impl Capabilities {
    pub fn from_user_agent(user_agent: &str, platform: &str, max_touch_points: u32) -> Self {
        Self {
            touch_capable: max_touch_points > 0,
            platform_category: classify_user_agent(user_agent),
            platform: if platform.is_empty() {
                "unknown".to_string()
            } else {
                platform.to_string()
            },
        }
    }

    /// Capabilities of the machine running the terminal front-end
    pub fn host() -> Self {
        let os = std::env::consts::OS;
        let agent = match os {
            "macos" => "Macintosh",
            "windows" => "Windows",
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => "Linux",
            "android" => "Android",
            "ios" => "iPhone",
            other => other,
        };
        Self::from_user_agent(agent, os, 0)
    }
}

/// Source of host capabilities, asked once per identified event
pub trait PlatformProbe {
    fn probe(&self) -> Capabilities;
}

impl PlatformProbe for Capabilities {
    fn probe(&self) -> Capabilities {
        self.clone()
    }
}

/// Probe for the terminal host
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl PlatformProbe for HostProbe {
    fn probe(&self) -> Capabilities {
        Capabilities::host()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    pub id: String,
    pub keyboard_location: KeyLocation,
    pub platform_category: PlatformCategory,
    pub has_touch: bool,
}

impl DeviceFingerprint {
    /// Short human label for assignment status lines
    pub fn summary(&self) -> String {
        let touch = if self.has_touch { ", touch" } else { "" };
        format!(
            "{} keys ({}{touch})",
            self.keyboard_location, self.platform_category
        )
    }

    pub fn is_numpad(&self) -> bool {
        self.keyboard_location == KeyLocation::Numpad
    }
}

/// Slot -> fingerprint. A fingerprint occupies at most one slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerAssignment {
    slots: [Option<DeviceFingerprint>; 2],
}

impl PlayerAssignment {
    pub fn get(&self, slot: PlayerSlot) -> Option<&DeviceFingerprint> {
        self.slots[slot.index()].as_ref()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn slot_of(&self, id: &str) -> Option<PlayerSlot> {
        PlayerSlot::ALL
            .into_iter()
            .find(|slot| self.get(*slot).is_some_and(|fp| fp.id == id))
    }

    /// `(slot, summary)` per slot, for the status display
    pub fn status(&self) -> Vec<(PlayerSlot, Option<String>)> {
        PlayerSlot::ALL
            .into_iter()
            .map(|slot| (slot, self.get(slot).map(DeviceFingerprint::summary)))
            .collect()
    }

    fn set(&mut self, slot: PlayerSlot, fingerprint: DeviceFingerprint) {
        self.slots[slot.index()] = Some(fingerprint);
    }

    fn clear(&mut self) {
        self.slots = [None, None];
    }

    /// Pick the slot a freshly identified fingerprint should take, if any.
    ///
    /// Numpads are preferred: a numpad displaces a non-numpad from slot 1,
    /// and may take slot 2 from a non-numpad when it differs from slot 1.
    /// Everything else only fills empty slots. Full assignments are frozen.
    fn place(&self, fingerprint: &DeviceFingerprint) -> Option<PlayerSlot> {
        if self.is_full() {
            return None;
        }

        let one = self.get(PlayerSlot::One);
        let two = self.get(PlayerSlot::Two);
        let differs_from_one = one.is_none_or(|fp| fp.id != fingerprint.id);

        if fingerprint.is_numpad() {
            if one.is_none_or(|fp| !fp.is_numpad()) {
                Some(PlayerSlot::One)
            } else if two.is_none_or(|fp| !fp.is_numpad()) && differs_from_one {
                Some(PlayerSlot::Two)
            } else {
                None
            }
        } else if one.is_none() {
            Some(PlayerSlot::One)
        } else if two.is_none() && differs_from_one {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }
}

/// Identifies the device behind each event and keeps devices pinned to players
pub struct DeviceRouter {
    probe: Box<dyn PlatformProbe>,
    observed: Vec<DeviceFingerprint>,
    assignment: PlayerAssignment,
}

impl std::fmt::Debug for DeviceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRouter")
            .field("observed", &self.observed)
            .field("assignment", &self.assignment)
            .finish()
    }
}

impl DeviceRouter {
    pub fn new(probe: Box<dyn PlatformProbe>) -> Self {
        Self {
            probe,
            observed: Vec::new(),
            assignment: PlayerAssignment::default(),
        }
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self::new(Box::new(capabilities))
    }

    /// Derive the fingerprint of the device that produced `event`
    pub fn identify(&self, event: &RawKeyEvent) -> DeviceFingerprint {
        let caps = self.probe.probe();
        let touch_origin = match event.touch_origin {
            Some(true) => "touch-origin",
            Some(false) => "key-origin",
            None => "any-origin",
        };
        let has_touch = if caps.touch_capable { "touch" } else { "notouch" };

        let id = [
            caps.platform_category.to_string(),
            caps.platform.clone(),
            has_touch.to_string(),
            touch_origin.to_string(),
            event.location.to_string(),
        ]
        .iter()
        .join("-");

        DeviceFingerprint {
            id,
            keyboard_location: event.location,
            platform_category: caps.platform_category,
            has_touch: caps.touch_capable,
        }
    }

    /// Identify, update the assignment, then route. This is the per-event entry point.
    pub fn observe(&mut self, event: &RawKeyEvent) -> Option<PlayerSlot> {
        let fingerprint = self.identify(event);

        if !self.observed.iter().any(|fp| fp.id == fingerprint.id) {
            debug!("new device seen: {}", fingerprint.id);
            self.observed.push(fingerprint.clone());
        }

        if let Some(slot) = self.assignment.place(&fingerprint) {
            if self.assignment.slot_of(&fingerprint.id) != Some(slot) {
                info!("{slot} assigned to {}", fingerprint.id);
                self.assignment.set(slot, fingerprint.clone());
            }
        }

        let routed = self.assignment.slot_of(&fingerprint.id);
        if routed.is_none() {
            debug!("dropping event from unassigned device {}", fingerprint.id);
        }
        routed
    }

    /// Slot currently assigned to the device behind `event`, without touching the assignment
    pub fn route(&self, event: &RawKeyEvent) -> Option<PlayerSlot> {
        self.assignment.slot_of(&self.identify(event).id)
    }

    pub fn assignment(&self) -> &PlayerAssignment {
        &self.assignment
    }

    /// Every distinct device seen since the last reset, in first-seen order
    pub fn observed_devices(&self) -> &[DeviceFingerprint] {
        &self.observed
    }

    pub fn reset(&mut self) {
        info!("device assignments cleared");
        self.assignment.clear();
        self.observed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn desktop() -> Capabilities {
        Capabilities::from_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0",
            "Linux x86_64",
            0,
        )
    }

    fn key(location: KeyLocation) -> RawKeyEvent {
        RawKeyEvent::new("2", location, Instant::now())
    }

    #[test]
    fn user_agent_classification() {
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari"),
            PlatformCategory::Mobile
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Linux; Android 13; SM-X200) Safari"),
            PlatformCategory::Tablet
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
            PlatformCategory::Mobile
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (iPad; CPU OS 17_0)"),
            PlatformCategory::Tablet
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
            PlatformCategory::Desktop
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (X11; CrOS x86_64 14541.0.0)"),
            PlatformCategory::Desktop
        );
        assert_eq!(classify_user_agent("curl/8.0"), PlatformCategory::Unknown);
        assert_eq!(classify_user_agent(""), PlatformCategory::Unknown);
    }

    #[test]
    fn probe_falls_back_to_unknown_platform() {
        let caps = Capabilities::from_user_agent("", "", 5);
        assert_eq!(caps.platform_category, PlatformCategory::Unknown);
        assert_eq!(caps.platform, "unknown");
        assert!(caps.touch_capable);
    }

    #[test]
    fn host_probe_never_fails() {
        let caps = HostProbe.probe();
        assert!(!caps.platform.is_empty());
        assert!(!caps.touch_capable);
    }

    #[test]
    fn identity_is_structural() {
        let router = DeviceRouter::with_capabilities(desktop());
        let a = router.identify(&key(KeyLocation::Numpad));
        let b = router.identify(&RawKeyEvent::new("9", KeyLocation::Numpad, Instant::now()));
        let c = router.identify(&key(KeyLocation::Standard));

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.platform_category, PlatformCategory::Desktop);
        assert!(a.is_numpad());
        assert_eq!(a.summary(), "numpad keys (desktop)");
    }

    #[test]
    fn touch_origin_hint_splits_fingerprints() {
        let router = DeviceRouter::with_capabilities(desktop());
        let plain = router.identify(&key(KeyLocation::Numpad));
        let touch = router.identify(&key(KeyLocation::Numpad).with_touch_origin(true));
        let keyed = router.identify(&key(KeyLocation::Numpad).with_touch_origin(false));

        assert_ne!(plain.id, touch.id);
        assert_ne!(plain.id, keyed.id);
        assert_ne!(touch.id, keyed.id);
    }

    #[test]
    fn numpads_fill_slots_and_third_is_dropped() {
        let mut router = DeviceRouter::with_capabilities(desktop());
        let first = key(KeyLocation::Numpad).with_touch_origin(false);
        let second = key(KeyLocation::Numpad).with_touch_origin(true);
        let third = key(KeyLocation::Numpad);

        assert_eq!(router.observe(&first), Some(PlayerSlot::One));
        assert_eq!(router.observe(&second), Some(PlayerSlot::Two));
        assert!(router.assignment().is_full());
        assert_eq!(router.observe(&third), None);

        // the first two keep routing
        assert_eq!(router.route(&first), Some(PlayerSlot::One));
        assert_eq!(router.route(&second), Some(PlayerSlot::Two));
        assert_eq!(router.observed_devices().len(), 3);
    }

    #[test]
    fn same_device_does_not_take_both_slots() {
        let mut router = DeviceRouter::with_capabilities(desktop());
        assert_eq!(router.observe(&key(KeyLocation::Standard)), Some(PlayerSlot::One));
        assert_eq!(router.observe(&key(KeyLocation::Standard)), Some(PlayerSlot::One));
        assert_eq!(router.assignment().get(PlayerSlot::Two), None);

        assert_eq!(router.observe(&key(KeyLocation::Numpad)), Some(PlayerSlot::One));
        assert_eq!(router.observe(&key(KeyLocation::Numpad)), Some(PlayerSlot::One));
        assert_eq!(router.assignment().get(PlayerSlot::Two), None);
    }

    #[test]
    fn numpad_displaces_keyboard_from_first_slot() {
        let mut router = DeviceRouter::with_capabilities(desktop());

        assert_eq!(router.observe(&key(KeyLocation::Standard)), Some(PlayerSlot::One));
        assert_eq!(router.observe(&key(KeyLocation::Numpad)), Some(PlayerSlot::One));
        // the displaced keyboard comes back and takes the open slot
        assert_eq!(router.observe(&key(KeyLocation::Standard)), Some(PlayerSlot::Two));
        assert!(router.assignment().is_full());

        // frozen now: a left-side key from the same machine goes nowhere
        assert_eq!(router.observe(&key(KeyLocation::Left)), None);
    }

    #[test]
    fn keyboards_fill_slots_in_order() {
        let mut router = DeviceRouter::with_capabilities(desktop());
        assert_eq!(router.observe(&key(KeyLocation::Left)), Some(PlayerSlot::One));
        assert_eq!(router.observe(&key(KeyLocation::Right)), Some(PlayerSlot::Two));
        // numpad arrives after the slots froze
        assert_eq!(router.observe(&key(KeyLocation::Numpad)), None);
    }

    #[test]
    fn route_does_not_assign() {
        let router = DeviceRouter::with_capabilities(desktop());
        assert_eq!(router.route(&key(KeyLocation::Numpad)), None);
        assert_eq!(router.assignment(), &PlayerAssignment::default());
    }

    #[test]
    fn reset_clears_assignment_and_history() {
        let mut router = DeviceRouter::with_capabilities(desktop());
        router.observe(&key(KeyLocation::Numpad));
        router.reset();
        assert_eq!(router.assignment().get(PlayerSlot::One), None);
        assert!(router.observed_devices().is_empty());

        let status = router.assignment().status();
        assert_eq!(status, vec![(PlayerSlot::One, None), (PlayerSlot::Two, None)]);
    }
}
