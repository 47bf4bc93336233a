// ABOUTME: Property tests for per-phase timeout resolution.
// ABOUTME: Unset phases follow the default; explicit phases never affect each other.

use canarist::timeout::{DEFAULT_TIMEOUT, Phase, TimeoutConfig};
use proptest::prelude::*;
use std::time::Duration;

fn phase() -> impl Strategy<Value = Phase> {
    prop::sample::select(Phase::ALL.to_vec())
}

fn seconds() -> impl Strategy<Value = Duration> {
    (1u64..86_400).prop_map(Duration::from_secs)
}

proptest! {
    #[test]
    fn unset_phases_resolve_to_default(default in seconds(), phase in phase()) {
        let timeouts = TimeoutConfig::new(default);
        prop_assert_eq!(timeouts.resolve(phase), default);
    }

    #[test]
    fn zero_phase_is_unset(default in seconds(), phase in phase()) {
        let timeouts = TimeoutConfig::new(default).with_phase(phase, Duration::ZERO);
        prop_assert_eq!(timeouts.resolve(phase), default);
    }

    #[test]
    fn explicit_phase_only_changes_itself(
        default in seconds(),
        explicit in seconds(),
        phase in phase(),
    ) {
        let timeouts = TimeoutConfig::new(default).with_phase(phase, explicit);

        for other in Phase::ALL {
            let expected = if other == phase { explicit } else { default };
            prop_assert_eq!(timeouts.resolve(other), expected);
        }
    }

    #[test]
    fn zero_default_uses_builtin_fallback(explicit in seconds(), phase in phase()) {
        let timeouts = TimeoutConfig::new(Duration::ZERO).with_phase(phase, explicit);

        prop_assert_eq!(timeouts.resolve(phase), explicit);
        prop_assert_eq!(timeouts.default_timeout(), DEFAULT_TIMEOUT);
    }
}
