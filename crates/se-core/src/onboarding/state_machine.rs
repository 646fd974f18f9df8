//! Onboarding state machine.
//!
//! A pure transition function for the device onboarding flow. It never
//! performs I/O; every side effect is returned as an [`OnboardingAction`] for
//! the orchestrator to execute, and the result comes back as another
//! [`OnboardingEvent`].
//!
//! 纯状态机：不包含副作用。

use std::time::Duration;

use crate::config::OnboardingSettings;
use crate::device::{AccessPoint, DeviceHandle};
use crate::ids::DeviceId;
use crate::navigation::{NavigationRequest, Screen};
use crate::security::SecretString;

use super::action::OnboardingAction;
use super::error::OnboardingError;
use super::event::OnboardingEvent;
use super::key_form::EncryptionKeyForm;
use super::validation::{validate_blinks_per_kwh, validate_wifi_credential};
use super::state::OnboardingState;
use super::wait::{WaitContext, WaitDecision, WaitMode, WaitPhase, WaitStep};

pub const DEFAULT_DECRYPTION_RETRY_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_BLINKS_PER_KWH: u32 = 1000;

/// Tunables the transitions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnboardingPolicy {
    pub decryption_retry_timeout: Duration,
    pub default_blinks_per_kwh: u32,
}

impl Default for OnboardingPolicy {
    fn default() -> Self {
        Self {
            decryption_retry_timeout: DEFAULT_DECRYPTION_RETRY_TIMEOUT,
            default_blinks_per_kwh: DEFAULT_BLINKS_PER_KWH,
        }
    }
}

impl From<&OnboardingSettings> for OnboardingPolicy {
    fn from(settings: &OnboardingSettings) -> Self {
        Self {
            decryption_retry_timeout: Duration::from_secs(settings.decryption_retry_timeout_secs),
            default_blinks_per_kwh: settings.default_blinks_per_kwh,
        }
    }
}

type Transition = (OnboardingState, Vec<OnboardingAction>);

#[derive(Debug, Clone, Default)]
pub struct OnboardingStateMachine {
    policy: OnboardingPolicy,
}

impl OnboardingStateMachine {
    pub fn new(policy: OnboardingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OnboardingPolicy {
        &self.policy
    }

    pub fn transition(&self, state: OnboardingState, event: OnboardingEvent) -> Transition {
        match (state, event) {
            // Leaving the flow always stops polling and discards the wait state.
            (_, OnboardingEvent::Cancel) => (
                OnboardingState::Idle,
                vec![OnboardingAction::StopSessionPolling],
            ),

            // Entry points
            (
                OnboardingState::Idle
                | OnboardingState::Done
                | OnboardingState::Error { .. }
                | OnboardingState::Linking { .. },
                OnboardingEvent::DeviceScanned { device_id },
            ) => start_linking(device_id),
            (
                OnboardingState::Idle | OnboardingState::Done | OnboardingState::Error { .. },
                OnboardingEvent::StartPairing { device_id },
            ) => start_pairing(device_id),

            // Scan entry
            (OnboardingState::Linking { device_id, .. }, OnboardingEvent::DeviceOnlineChecked { online }) => {
                if online {
                    let action = OnboardingAction::LinkDevice {
                        device_id: device_id.clone(),
                    };
                    (
                        OnboardingState::Linking {
                            device_id,
                            error: None,
                        },
                        vec![action],
                    )
                } else {
                    start_pairing(device_id)
                }
            }
            (OnboardingState::Linking { .. }, OnboardingEvent::DeviceLinked) => (
                OnboardingState::Done,
                vec![OnboardingAction::Navigate(NavigationRequest::to(Screen::Main))],
            ),
            (OnboardingState::Linking { device_id, .. }, OnboardingEvent::DeviceLinkFailed) => (
                OnboardingState::Linking {
                    device_id,
                    error: Some(OnboardingError::DeviceLinkFailed),
                },
                Vec::new(),
            ),

            // Pairing
            (
                OnboardingState::Pairing { device_id, .. },
                OnboardingEvent::ProvisioningSucceeded { device },
            ) => {
                let navigate = OnboardingAction::Navigate(NavigationRequest::with_device(
                    Screen::ConnectWifi,
                    device_id,
                ));
                let list = OnboardingAction::ListAccessPoints {
                    device: device.clone(),
                };
                (wifi_state(device, Vec::new(), None), vec![navigate, list])
            }
            (OnboardingState::Pairing { device_id, .. }, OnboardingEvent::ProvisioningFailed) => (
                OnboardingState::Pairing {
                    device_id,
                    in_progress: false,
                    error: Some(OnboardingError::ProvisioningFailed),
                },
                Vec::new(),
            ),
            (
                OnboardingState::Pairing {
                    device_id,
                    in_progress: false,
                    ..
                },
                OnboardingEvent::RetryPairing,
            ) => {
                let action = OnboardingAction::ProvisionDevice {
                    device_id: device_id.clone(),
                };
                (
                    OnboardingState::Pairing {
                        device_id,
                        in_progress: true,
                        error: None,
                    },
                    vec![action],
                )
            }

            // Wi-Fi
            (state @ OnboardingState::WifiConnecting { .. }, event) => self.on_wifi(state, event),

            // Profile branch
            (
                OnboardingState::ProfileBranch { device_id, .. },
                OnboardingEvent::DeviceProfileResolved { profile },
            ) => {
                if profile.needs_blinks_per_kwh() {
                    let navigate = OnboardingAction::Navigate(NavigationRequest::with_device(
                        Screen::BlinksPerKwh,
                        device_id.clone(),
                    ));
                    (
                        OnboardingState::BlinksPerKwhEntry {
                            device_id,
                            value: self.policy.default_blinks_per_kwh.to_string(),
                            saving: false,
                            error: None,
                        },
                        vec![navigate],
                    )
                } else {
                    begin_wait(device_id, WaitMode::Onboarding)
                }
            }
            (
                OnboardingState::ProfileBranch { device_id, .. },
                OnboardingEvent::DeviceProfileLookupFailed,
            ) => (
                OnboardingState::ProfileBranch {
                    device_id,
                    error: Some(OnboardingError::DeviceInfoUnavailable),
                },
                Vec::new(),
            ),
            (OnboardingState::ProfileBranch { device_id, .. }, OnboardingEvent::RetryProfileLookup) => {
                let action = OnboardingAction::LookupDeviceProfile {
                    device_id: device_id.clone(),
                };
                (
                    OnboardingState::ProfileBranch {
                        device_id,
                        error: None,
                    },
                    vec![action],
                )
            }

            // Blinks per kWh
            (state @ OnboardingState::BlinksPerKwhEntry { .. }, event) => {
                Self::on_blinks_per_kwh(state, event)
            }

            // Encryption keys
            (state @ OnboardingState::EncryptionKeyEntry { .. }, event) => {
                Self::on_encryption_keys(state, event)
            }

            // Wait for completion
            (
                OnboardingState::OnboardingWait { wait } | OnboardingState::FirmwareUpdating { wait },
                OnboardingEvent::SessionPolled {
                    session,
                    observed_at_ms,
                },
            ) => {
                let step = WaitStep::new(self.policy.decryption_retry_timeout);
                let (wait, decision) = step.apply(wait, &session, observed_at_ms);
                on_wait_decision(wait, decision)
            }

            // Anything else (including late results) leaves the state untouched.
            (state, event) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(?state, event = event.name(), "ignored onboarding event");
                #[cfg(not(feature = "tracing"))]
                let _ = event;
                (state, Vec::new())
            }
        }
    }

    fn on_wifi(&self, state: OnboardingState, event: OnboardingEvent) -> Transition {
        let OnboardingState::WifiConnecting {
            device,
            access_points,
            selected_ssid,
            connecting,
            error,
        } = state
        else {
            return (state, Vec::new());
        };

        match event {
            OnboardingEvent::AccessPointsListed { access_points } => {
                (wifi_with(device, access_points, selected_ssid, connecting, None), Vec::new())
            }
            OnboardingEvent::AccessPointsUnavailable => (
                wifi_with(
                    device,
                    access_points,
                    selected_ssid,
                    connecting,
                    Some(OnboardingError::AccessPointsUnavailable),
                ),
                Vec::new(),
            ),
            OnboardingEvent::RefreshAccessPoints if !connecting => {
                let action = OnboardingAction::ListAccessPoints {
                    device: device.clone(),
                };
                (wifi_with(device, access_points, None, false, None), vec![action])
            }
            OnboardingEvent::SelectAccessPoint { ssid } if !connecting => {
                let Some(ap) = access_points.iter().find(|ap| ap.ssid == ssid) else {
                    return (
                        wifi_with(device, access_points, selected_ssid, connecting, error),
                        Vec::new(),
                    );
                };
                if ap.requires_credential() {
                    let action = OnboardingAction::RequestCredential { ssid: ssid.clone() };
                    (
                        wifi_with(device, access_points, Some(ssid), false, None),
                        vec![action],
                    )
                } else {
                    let action = OnboardingAction::ConnectWifi {
                        device: device.clone(),
                        ssid: ssid.clone(),
                        credential: SecretString::empty(),
                    };
                    (
                        wifi_with(device, access_points, Some(ssid), true, None),
                        vec![action],
                    )
                }
            }
            OnboardingEvent::CredentialProvided { credential } if !connecting => {
                let Some(ssid) = selected_ssid else {
                    return (wifi_with(device, access_points, None, false, error), Vec::new());
                };
                if let Err(err) = validate_wifi_credential(credential.expose()) {
                    return (
                        wifi_with(device, access_points, None, false, Some(err.into())),
                        Vec::new(),
                    );
                }
                let action = OnboardingAction::ConnectWifi {
                    device: device.clone(),
                    ssid: ssid.clone(),
                    credential,
                };
                (
                    wifi_with(device, access_points, Some(ssid), true, None),
                    vec![action],
                )
            }
            OnboardingEvent::CredentialDismissed if !connecting => {
                (wifi_with(device, access_points, None, false, None), Vec::new())
            }
            OnboardingEvent::WifiConnected if connecting => {
                let device_id = device.device_id;
                let action = OnboardingAction::LookupDeviceProfile {
                    device_id: device_id.clone(),
                };
                (
                    OnboardingState::ProfileBranch {
                        device_id,
                        error: None,
                    },
                    vec![action],
                )
            }
            OnboardingEvent::WifiConnectFailed if connecting => (
                wifi_with(
                    device,
                    access_points,
                    None,
                    false,
                    Some(OnboardingError::WifiConnectFailed),
                ),
                Vec::new(),
            ),
            _ => (
                wifi_with(device, access_points, selected_ssid, connecting, error),
                Vec::new(),
            ),
        }
    }

    fn on_blinks_per_kwh(state: OnboardingState, event: OnboardingEvent) -> Transition {
        let OnboardingState::BlinksPerKwhEntry {
            device_id,
            value,
            saving,
            error,
        } = state
        else {
            return (state, Vec::new());
        };

        match event {
            OnboardingEvent::EditBlinksPerKwh { value } if !saving => (
                OnboardingState::BlinksPerKwhEntry {
                    device_id,
                    value,
                    saving,
                    error: None,
                },
                Vec::new(),
            ),
            OnboardingEvent::SubmitBlinksPerKwh if !saving => match validate_blinks_per_kwh(&value) {
                Ok(parsed) => {
                    let action = OnboardingAction::SetBlinksPerKwh {
                        device_id: device_id.clone(),
                        value: parsed,
                    };
                    (
                        OnboardingState::BlinksPerKwhEntry {
                            device_id,
                            value,
                            saving: true,
                            error: None,
                        },
                        vec![action],
                    )
                }
                Err(err) => (
                    OnboardingState::BlinksPerKwhEntry {
                        device_id,
                        value,
                        saving,
                        error: Some(err.into()),
                    },
                    Vec::new(),
                ),
            },
            OnboardingEvent::BlinksPerKwhSaved if saving => {
                begin_wait(device_id, WaitMode::Onboarding)
            }
            OnboardingEvent::BlinksPerKwhSaveFailed if saving => (
                OnboardingState::BlinksPerKwhEntry {
                    device_id,
                    value,
                    saving: false,
                    error: Some(OnboardingError::BlinksPerKwhSaveFailed),
                },
                Vec::new(),
            ),
            _ => (
                OnboardingState::BlinksPerKwhEntry {
                    device_id,
                    value,
                    saving,
                    error,
                },
                Vec::new(),
            ),
        }
    }

    fn on_encryption_keys(state: OnboardingState, event: OnboardingEvent) -> Transition {
        let OnboardingState::EncryptionKeyEntry {
            device_id,
            mut form,
            saving,
            error,
        } = state
        else {
            return (state, Vec::new());
        };

        match event {
            OnboardingEvent::DeviceProfileResolved { profile } => {
                // A rejected-key notice survives the lookup; a lookup failure does not.
                let error = error.filter(|err| *err != OnboardingError::KeyProfileLookupFailed);
                (
                    OnboardingState::EncryptionKeyEntry {
                        device_id,
                        form: Some(EncryptionKeyForm::for_profile(profile)),
                        saving: false,
                        error,
                    },
                    Vec::new(),
                )
            }
            OnboardingEvent::DeviceProfileLookupFailed => (
                OnboardingState::EncryptionKeyEntry {
                    device_id,
                    form,
                    saving,
                    error: Some(OnboardingError::KeyProfileLookupFailed),
                },
                Vec::new(),
            ),
            OnboardingEvent::RetryProfileLookup if form.is_none() => {
                let action = OnboardingAction::LookupDeviceProfile {
                    device_id: device_id.clone(),
                };
                (
                    OnboardingState::EncryptionKeyEntry {
                        device_id,
                        form,
                        saving,
                        error: None,
                    },
                    vec![action],
                )
            }
            OnboardingEvent::EditEncryptionKey { field, value } if !saving => {
                if let Some(form) = form.as_mut() {
                    form.edit(field, value);
                }
                (
                    OnboardingState::EncryptionKeyEntry {
                        device_id,
                        form,
                        saving,
                        error,
                    },
                    Vec::new(),
                )
            }
            OnboardingEvent::BlurEncryptionKey { field } => {
                if let Some(form) = form.as_mut() {
                    form.blur(field);
                }
                (
                    OnboardingState::EncryptionKeyEntry {
                        device_id,
                        form,
                        saving,
                        error,
                    },
                    Vec::new(),
                )
            }
            OnboardingEvent::SubmitEncryptionKeys if !saving => {
                let Some(mut active) = form else {
                    return (
                        OnboardingState::EncryptionKeyEntry {
                            device_id,
                            form: None,
                            saving,
                            error,
                        },
                        Vec::new(),
                    );
                };
                if !active.validate_all() {
                    return (
                        OnboardingState::EncryptionKeyEntry {
                            device_id,
                            form: Some(active),
                            saving,
                            error,
                        },
                        Vec::new(),
                    );
                }
                let action = OnboardingAction::SetEncryptionKey {
                    device_id: device_id.clone(),
                    keys: active.to_keys(),
                };
                (
                    OnboardingState::EncryptionKeyEntry {
                        device_id,
                        form: Some(active),
                        saving: true,
                        error: None,
                    },
                    vec![action],
                )
            }
            OnboardingEvent::EncryptionKeysSaved if saving => {
                begin_wait(device_id, WaitMode::KeyVerification)
            }
            OnboardingEvent::EncryptionKeysSaveFailed if saving => (
                OnboardingState::EncryptionKeyEntry {
                    device_id,
                    form,
                    saving: false,
                    error: Some(OnboardingError::EncryptionKeySaveFailed),
                },
                Vec::new(),
            ),
            _ => (
                OnboardingState::EncryptionKeyEntry {
                    device_id,
                    form,
                    saving,
                    error,
                },
                Vec::new(),
            ),
        }
    }
}

fn start_linking(device_id: DeviceId) -> Transition {
    let action = OnboardingAction::CheckDeviceOnline {
        device_id: device_id.clone(),
    };
    (
        OnboardingState::Linking {
            device_id,
            error: None,
        },
        vec![OnboardingAction::StopSessionPolling, action],
    )
}

fn start_pairing(device_id: DeviceId) -> Transition {
    let actions = vec![
        OnboardingAction::StopSessionPolling,
        OnboardingAction::Navigate(NavigationRequest::with_device(
            Screen::Pair,
            device_id.clone(),
        )),
        OnboardingAction::ProvisionDevice {
            device_id: device_id.clone(),
        },
    ];
    (
        OnboardingState::Pairing {
            device_id,
            in_progress: true,
            error: None,
        },
        actions,
    )
}

fn wifi_state(
    device: DeviceHandle,
    access_points: Vec<AccessPoint>,
    error: Option<OnboardingError>,
) -> OnboardingState {
    wifi_with(device, access_points, None, false, error)
}

fn wifi_with(
    device: DeviceHandle,
    access_points: Vec<AccessPoint>,
    selected_ssid: Option<String>,
    connecting: bool,
    error: Option<OnboardingError>,
) -> OnboardingState {
    OnboardingState::WifiConnecting {
        device,
        access_points,
        selected_ssid,
        connecting,
        error,
    }
}

/// Enter the wait. Onboarding mode navigates to the wait screen; key
/// verification stays on the key screen.
fn begin_wait(device_id: DeviceId, mode: WaitMode) -> Transition {
    let mut actions = Vec::with_capacity(2);
    if mode == WaitMode::Onboarding {
        actions.push(OnboardingAction::Navigate(NavigationRequest::with_device(
            Screen::OnboardingWait,
            device_id.clone(),
        )));
    }
    actions.push(OnboardingAction::StartSessionPolling {
        device_id: device_id.clone(),
    });
    (
        OnboardingState::OnboardingWait {
            wait: WaitContext::new(device_id, mode),
        },
        actions,
    )
}

fn back_to_key_form(device_id: DeviceId, error: Option<OnboardingError>) -> Transition {
    let action = OnboardingAction::LookupDeviceProfile {
        device_id: device_id.clone(),
    };
    (
        OnboardingState::EncryptionKeyEntry {
            device_id,
            form: None,
            saving: false,
            error,
        },
        vec![OnboardingAction::StopSessionPolling, action],
    )
}

fn on_wait_decision(wait: WaitContext, decision: WaitDecision) -> Transition {
    match decision {
        WaitDecision::KeepPolling => {
            let state = match wait.phase {
                WaitPhase::Waiting => OnboardingState::OnboardingWait { wait },
                WaitPhase::FirmwareUpdating => OnboardingState::FirmwareUpdating { wait },
            };
            (state, Vec::new())
        }
        WaitDecision::Completed => (
            OnboardingState::Done,
            vec![
                OnboardingAction::StopSessionPolling,
                OnboardingAction::Navigate(NavigationRequest::to(Screen::Main)),
            ],
        ),
        WaitDecision::Redirect { target } => {
            let device_id = wait.device_id;
            let (state, mut actions) = back_to_key_form(device_id.clone(), None);
            actions.insert(
                1,
                OnboardingAction::Navigate(NavigationRequest::with_device(target, device_id)),
            );
            (state, actions)
        }
        WaitDecision::KeyRejected { .. } | WaitDecision::DecryptionTimedOut { .. } => {
            back_to_key_form(wait.device_id, Some(OnboardingError::KeyNotAccepted))
        }
        WaitDecision::Fatal { disposition } => (
            OnboardingState::Error {
                device_id: wait.device_id,
                disposition,
            },
            vec![OnboardingAction::StopSessionPolling],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceProfile, WifiAuthMode};
    use crate::onboarding::key_form::KeyField;
    use crate::onboarding::session::OnboardingSession;
    use crate::onboarding::validation::ValidationError;

    fn machine() -> OnboardingStateMachine {
        OnboardingStateMachine::default()
    }

    fn id() -> DeviceId {
        DeviceId::from("SE-1")
    }

    fn handle() -> DeviceHandle {
        DeviceHandle {
            device_id: id(),
            transport_name: "PROV_SE-1".to_string(),
        }
    }

    fn connecting_state() -> OnboardingState {
        OnboardingState::WifiConnecting {
            device: handle(),
            access_points: vec![
                AccessPoint::new("Home", WifiAuthMode::Wpa2Psk),
                AccessPoint::new("Guest", WifiAuthMode::Open),
            ],
            selected_ssid: Some("Home".to_string()),
            connecting: true,
            error: None,
        }
    }

    fn polled(session: OnboardingSession, at: i64) -> OnboardingEvent {
        OnboardingEvent::SessionPolled {
            session,
            observed_at_ms: at,
        }
    }

    fn navigations(actions: &[OnboardingAction]) -> Vec<&NavigationRequest> {
        actions
            .iter()
            .filter_map(|action| match action {
                OnboardingAction::Navigate(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn wait_state(mode: WaitMode) -> OnboardingState {
        OnboardingState::OnboardingWait {
            wait: WaitContext::new(id(), mode),
        }
    }

    #[test]
    fn start_pairing_provisions_device() {
        let (state, actions) = machine().transition(
            OnboardingState::Idle,
            OnboardingEvent::StartPairing { device_id: id() },
        );
        assert!(matches!(state, OnboardingState::Pairing { in_progress: true, .. }));
        assert!(actions.contains(&OnboardingAction::ProvisionDevice { device_id: id() }));
    }

    #[test]
    fn provisioning_failure_allows_manual_retry() {
        let m = machine();
        let (state, _) = m.transition(
            OnboardingState::Pairing {
                device_id: id(),
                in_progress: true,
                error: None,
            },
            OnboardingEvent::ProvisioningFailed,
        );
        assert_eq!(
            state.status_message().as_deref(),
            Some("Error provisioning device, reset device and try again")
        );

        let (state, actions) = m.transition(state, OnboardingEvent::RetryPairing);
        assert!(matches!(state, OnboardingState::Pairing { in_progress: true, error: None, .. }));
        assert_eq!(actions, vec![OnboardingAction::ProvisionDevice { device_id: id() }]);
    }

    #[test]
    fn provisioning_success_carries_handle_into_wifi_step() {
        let (state, actions) = machine().transition(
            OnboardingState::Pairing {
                device_id: id(),
                in_progress: true,
                error: None,
            },
            OnboardingEvent::ProvisioningSucceeded { device: handle() },
        );
        assert!(matches!(&state, OnboardingState::WifiConnecting { device, .. } if *device == handle()));
        assert!(actions.contains(&OnboardingAction::ListAccessPoints { device: handle() }));
    }

    #[test]
    fn open_network_connects_with_empty_credential() {
        let m = machine();
        let (state, _) = m.transition(
            connecting_state(),
            OnboardingEvent::WifiConnectFailed,
        );
        let (_, actions) = m.transition(
            state,
            OnboardingEvent::SelectAccessPoint {
                ssid: "Guest".to_string(),
            },
        );
        assert_eq!(
            actions,
            vec![OnboardingAction::ConnectWifi {
                device: handle(),
                ssid: "Guest".to_string(),
                credential: SecretString::empty(),
            }]
        );
    }

    #[test]
    fn secured_network_prompts_and_rejects_empty_credential() {
        let m = machine();
        let (state, _) = m.transition(connecting_state(), OnboardingEvent::WifiConnectFailed);
        let (state, actions) = m.transition(
            state,
            OnboardingEvent::SelectAccessPoint {
                ssid: "Home".to_string(),
            },
        );
        assert_eq!(
            actions,
            vec![OnboardingAction::RequestCredential {
                ssid: "Home".to_string()
            }]
        );

        let (state, actions) = m.transition(
            state,
            OnboardingEvent::CredentialProvided {
                credential: SecretString::empty(),
            },
        );
        assert!(actions.is_empty());
        assert!(matches!(
            state,
            OnboardingState::WifiConnecting {
                error: Some(OnboardingError::Validation(ValidationError::WifiCredentialEmpty)),
                ..
            }
        ));
    }

    #[test]
    fn wifi_connect_failure_keeps_user_on_list() {
        let (state, actions) =
            machine().transition(connecting_state(), OnboardingEvent::WifiConnectFailed);
        assert!(actions.is_empty());
        assert_eq!(state.status_message().as_deref(), Some("Failed to connect to WiFi"));
        assert!(matches!(state, OnboardingState::WifiConnecting { connecting: false, .. }));
    }

    #[test]
    fn profile_one_after_wifi_enters_blinks_per_kwh_with_default() {
        let m = machine();
        let (state, actions) = m.transition(connecting_state(), OnboardingEvent::WifiConnected);
        assert_eq!(actions, vec![OnboardingAction::LookupDeviceProfile { device_id: id() }]);

        let (state, actions) = m.transition(
            state,
            OnboardingEvent::DeviceProfileResolved {
                profile: DeviceProfile::new(1),
            },
        );
        assert!(matches!(
            &state,
            OnboardingState::BlinksPerKwhEntry { value, .. } if value == "1000"
        ));
        assert_eq!(navigations(&actions)[0].screen, Screen::BlinksPerKwh);
    }

    #[test]
    fn profile_six_after_wifi_goes_straight_to_wait() {
        let m = machine();
        let (state, _) = m.transition(connecting_state(), OnboardingEvent::WifiConnected);
        let (state, actions) = m.transition(
            state,
            OnboardingEvent::DeviceProfileResolved {
                profile: DeviceProfile::new(6),
            },
        );
        assert_eq!(state, wait_state(WaitMode::Onboarding));
        assert!(actions.contains(&OnboardingAction::StartSessionPolling { device_id: id() }));
        assert_eq!(navigations(&actions)[0].screen, Screen::OnboardingWait);
    }

    #[test]
    fn profile_lookup_failure_can_be_retried() {
        let m = machine();
        let (state, _) = m.transition(
            OnboardingState::ProfileBranch {
                device_id: id(),
                error: None,
            },
            OnboardingEvent::DeviceProfileLookupFailed,
        );
        assert_eq!(state.status_message().as_deref(), Some("Error getting device info"));

        let (_, actions) = m.transition(state, OnboardingEvent::RetryProfileLookup);
        assert_eq!(actions, vec![OnboardingAction::LookupDeviceProfile { device_id: id() }]);
    }

    #[test]
    fn blinks_per_kwh_rejects_zero_and_forwards_valid_value() {
        let m = machine();
        let entry = OnboardingState::BlinksPerKwhEntry {
            device_id: id(),
            value: "1000".to_string(),
            saving: false,
            error: None,
        };

        let (state, _) = m.transition(
            entry,
            OnboardingEvent::EditBlinksPerKwh {
                value: "0".to_string(),
            },
        );
        let (state, actions) = m.transition(state, OnboardingEvent::SubmitBlinksPerKwh);
        assert!(actions.is_empty());
        assert_eq!(
            state.status_message().as_deref(),
            Some("Blinks per kWh must be a higher number than 0.")
        );

        let (state, _) = m.transition(
            state,
            OnboardingEvent::EditBlinksPerKwh {
                value: "1000".to_string(),
            },
        );
        let (state, actions) = m.transition(state, OnboardingEvent::SubmitBlinksPerKwh);
        assert_eq!(
            actions,
            vec![OnboardingAction::SetBlinksPerKwh {
                device_id: id(),
                value: 1000
            }]
        );

        let (state, actions) = m.transition(state, OnboardingEvent::BlinksPerKwhSaved);
        assert_eq!(state, wait_state(WaitMode::Onboarding));
        assert!(actions.contains(&OnboardingAction::StartSessionPolling { device_id: id() }));
    }

    #[test]
    fn blinks_per_kwh_save_failure_stays_on_form() {
        let (state, _) = machine().transition(
            OnboardingState::BlinksPerKwhEntry {
                device_id: id(),
                value: "800".to_string(),
                saving: true,
                error: None,
            },
            OnboardingEvent::BlinksPerKwhSaveFailed,
        );
        assert_eq!(
            state.status_message().as_deref(),
            Some("An error occurred. Please try again.")
        );
    }

    #[test]
    fn done_snapshot_navigates_to_main_exactly_once() {
        let (state, actions) = machine().transition(
            wait_state(WaitMode::Onboarding),
            polled(OnboardingSession::done(), 0),
        );
        assert_eq!(state, OnboardingState::Done);
        assert_eq!(actions[0], OnboardingAction::StopSessionPolling);
        let navs = navigations(&actions);
        assert_eq!(navs.len(), 1);
        assert_eq!(navs[0].screen, Screen::Main);

        // A late snapshot after Done changes nothing.
        let (state, actions) = machine().transition(state, polled(OnboardingSession::done(), 10));
        assert_eq!(state, OnboardingState::Done);
        assert!(actions.is_empty());
    }

    #[test]
    fn firmware_progress_moves_to_firmware_updating() {
        let (state, actions) = machine().transition(
            wait_state(WaitMode::Onboarding),
            polled(OnboardingSession::firmware_update(Some(12)), 0),
        );
        assert!(matches!(state, OnboardingState::FirmwareUpdating { .. }));
        assert!(actions.is_empty());
    }

    #[test]
    fn credential_error_during_onboarding_redirects_to_key_entry() {
        let (state, actions) = machine().transition(
            wait_state(WaitMode::Onboarding),
            polled(OnboardingSession::error("SecurityError"), 0),
        );
        assert!(matches!(state, OnboardingState::EncryptionKeyEntry { form: None, .. }));
        assert_eq!(actions[0], OnboardingAction::StopSessionPolling);
        assert_eq!(navigations(&actions)[0].screen, Screen::EncryptionKey);
        assert!(actions.contains(&OnboardingAction::LookupDeviceProfile { device_id: id() }));
    }

    #[test]
    fn fatal_error_stops_polling_without_navigation() {
        let (state, actions) = machine().transition(
            wait_state(WaitMode::Onboarding),
            polled(OnboardingSession::error("NegotiateError"), 0),
        );
        assert!(matches!(state, OnboardingState::Error { .. }));
        assert_eq!(actions, vec![OnboardingAction::StopSessionPolling]);
    }

    #[test]
    fn profile_six_key_form_renders_two_gpk_fields() {
        let (state, _) = machine().transition(
            OnboardingState::EncryptionKeyEntry {
                device_id: id(),
                form: None,
                saving: false,
                error: None,
            },
            OnboardingEvent::DeviceProfileResolved {
                profile: DeviceProfile::new(6),
            },
        );
        let OnboardingState::EncryptionKeyEntry { form: Some(form), .. } = state else {
            panic!("expected key form, got {state:?}");
        };
        assert_eq!(form.fields(), &[KeyField::Gpk60, KeyField::Gpk61]);
    }

    #[test]
    fn invalid_keys_are_not_submitted() {
        let m = machine();
        let mut form = EncryptionKeyForm::for_profile(DeviceProfile::new(5));
        form.edit(KeyField::Mep, "short".to_string());
        let (state, actions) = m.transition(
            OnboardingState::EncryptionKeyEntry {
                device_id: id(),
                form: Some(form),
                saving: false,
                error: None,
            },
            OnboardingEvent::SubmitEncryptionKeys,
        );
        assert!(actions.is_empty());
        let OnboardingState::EncryptionKeyEntry { form: Some(form), .. } = state else {
            panic!("expected key form");
        };
        assert!(form.error(KeyField::Mep).is_some());
    }

    #[test]
    fn saved_keys_start_key_verification_without_navigation() {
        let m = machine();
        let mut form = EncryptionKeyForm::for_profile(DeviceProfile::new(5));
        form.edit(KeyField::Mep, "m".repeat(20));
        let (state, actions) = m.transition(
            OnboardingState::EncryptionKeyEntry {
                device_id: id(),
                form: Some(form),
                saving: false,
                error: None,
            },
            OnboardingEvent::SubmitEncryptionKeys,
        );
        assert!(matches!(
            &actions[..],
            [OnboardingAction::SetEncryptionKey { keys, .. }] if keys.mep_key.expose() == "m".repeat(20)
        ));

        let (state, actions) = m.transition(state, OnboardingEvent::EncryptionKeysSaved);
        assert_eq!(state, wait_state(WaitMode::KeyVerification));
        assert_eq!(actions, vec![OnboardingAction::StartSessionPolling { device_id: id() }]);
    }

    #[test]
    fn persistent_decryption_error_returns_to_key_form_with_notice() {
        let m = machine();
        let decryption = || OnboardingSession::error("DecryptionError");

        let (state, actions) = m.transition(wait_state(WaitMode::KeyVerification), polled(decryption(), 0));
        assert!(actions.is_empty());
        let (state, actions) = m.transition(state, polled(decryption(), 90_000));
        assert!(actions.is_empty());
        let (state, actions) = m.transition(state, polled(decryption(), 181_000));

        assert!(matches!(
            state,
            OnboardingState::EncryptionKeyEntry {
                error: Some(OnboardingError::KeyNotAccepted),
                ..
            }
        ));
        assert_eq!(actions[0], OnboardingAction::StopSessionPolling);
        assert!(navigations(&actions).is_empty());
    }

    #[test]
    fn cancel_stops_polling_and_discards_wait_state() {
        let m = machine();
        let (state, _) = m.transition(
            wait_state(WaitMode::KeyVerification),
            polled(OnboardingSession::error("DecryptionError"), 0),
        );
        let (state, actions) = m.transition(state, OnboardingEvent::Cancel);
        assert_eq!(state, OnboardingState::Idle);
        assert_eq!(actions, vec![OnboardingAction::StopSessionPolling]);

        let (state, actions) = m.transition(state, polled(OnboardingSession::done(), 1));
        assert_eq!(state, OnboardingState::Idle);
        assert!(actions.is_empty());
    }

    #[test]
    fn online_scanned_device_is_linked_and_skips_pairing() {
        let m = machine();
        let (state, actions) = m.transition(
            OnboardingState::Idle,
            OnboardingEvent::DeviceScanned { device_id: id() },
        );
        assert!(actions.contains(&OnboardingAction::CheckDeviceOnline { device_id: id() }));

        let (state, actions) = m.transition(state, OnboardingEvent::DeviceOnlineChecked { online: true });
        assert_eq!(actions, vec![OnboardingAction::LinkDevice { device_id: id() }]);

        let (state, actions) = m.transition(state, OnboardingEvent::DeviceLinked);
        assert_eq!(state, OnboardingState::Done);
        assert_eq!(navigations(&actions)[0].screen, Screen::Main);
    }

    #[test]
    fn offline_scanned_device_starts_pairing() {
        let m = machine();
        let (state, _) = m.transition(
            OnboardingState::Idle,
            OnboardingEvent::DeviceScanned { device_id: id() },
        );
        let (state, actions) =
            m.transition(state, OnboardingEvent::DeviceOnlineChecked { online: false });
        assert!(matches!(state, OnboardingState::Pairing { .. }));
        assert_eq!(navigations(&actions)[0].screen, Screen::Pair);
    }

    #[test]
    fn policy_follows_settings() {
        let settings = OnboardingSettings {
            poll_interval_ms: 500,
            decryption_retry_timeout_secs: 30,
            default_blinks_per_kwh: 800,
        };
        let policy = OnboardingPolicy::from(&settings);
        assert_eq!(policy.decryption_retry_timeout, Duration::from_secs(30));
        assert_eq!(policy.default_blinks_per_kwh, 800);
    }
}
