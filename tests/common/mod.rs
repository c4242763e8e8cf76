//! Shared fixtures for integration tests
#![allow(dead_code)]

use archprov::config::{Configuration, ConfigurationDraft, SshSettings};
use archprov::types::PartitionType;
use proptest::prelude::*;

pub fn draft(partition_type: PartitionType) -> ConfigurationDraft {
    ConfigurationDraft {
        hostname: "archbox".to_string(),
        username: "alice".to_string(),
        root_password: "rootpw".to_string(),
        user_password: "userpw".to_string(),
        timezone: "Europe/London".to_string(),
        partition_type: Some(partition_type),
        auto_reboot: false,
        ssh: None,
        software: vec![],
    }
}

pub fn config(partition_type: PartitionType) -> Configuration {
    draft(partition_type).finalize().expect("fixture is valid") // test: static fixture
}

pub fn partition_type_strategy() -> impl Strategy<Value = PartitionType> {
    prop_oneof![
        Just(PartitionType::Mbr),
        Just(PartitionType::Gpt),
        Just(PartitionType::Efi),
    ]
}

fn ssh_strategy() -> impl Strategy<Value = Option<SshSettings>> {
    prop::option::of((1u16..=u16::MAX, any::<bool>(), any::<bool>()).prop_map(
        |(port, permit_root_login, password_authentication)| SshSettings {
            port,
            permit_root_login,
            password_authentication,
        },
    ))
}

/// Any configuration the wizard could produce
pub fn configuration_strategy() -> impl Strategy<Value = Configuration> {
    (
        "[a-z][a-z0-9-]{0,15}",
        "[a-z_][a-z0-9_-]{0,15}",
        "\\PC{1,24}",
        "\\PC{1,24}",
        prop::sample::select(vec!["America/New_York", "Europe/London", "Asia/Tokyo", "Europe/Berlin"]),
        partition_type_strategy(),
        any::<bool>(),
        ssh_strategy(),
        prop::collection::vec(prop::sample::select(vec!["git", "vim", "nodejs npm", "firefox"]), 0..4),
    )
        .prop_filter_map(
            "passwords must not be blank",
            |(hostname, username, root_pw, user_pw, tz, partition_type, auto_reboot, ssh, software)| {
                ConfigurationDraft {
                    hostname,
                    username,
                    root_password: root_pw,
                    user_password: user_pw,
                    timezone: tz.to_string(),
                    partition_type: Some(partition_type),
                    auto_reboot,
                    ssh,
                    software: software.into_iter().map(str::to_string).collect(),
                }
                .finalize()
                .ok()
            },
        )
}
