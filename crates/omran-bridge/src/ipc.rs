// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire protocol between page script and the bridge.
//
// Request:  { "id": 7, "op": "save-backup", "args": { "backupId": "...", "json": "...", "dir": null } }
// Reply:    { "id": 7, "ok": true, "value": { "success": true, "path": "..." } }
//           { "id": 7, "ok": false, "error": "unknown operation \"read-file\"" }
//
// Everything arriving here is adversarial. Unknown operations, unknown
// fields, and wrong types produce an error reply; nothing panics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::traits::PrivilegedBridge;

pub const OP_GET_MACHINE_ID: &str = "get-machine-id";
pub const OP_GET_DEFAULT_BACKUP_DIR: &str = "get-default-backup-dir";
pub const OP_SAVE_BACKUP: &str = "save-backup";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    id: u64,
    op: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SaveBackupArgs {
    backup_id: String,
    json: String,
    #[serde(default)]
    dir: Option<String>,
}

/// A decoded bridge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    GetMachineId,
    GetDefaultBackupDir,
    SaveBackup {
        backup_id: String,
        json: String,
        dir: Option<String>,
    },
}

impl BridgeRequest {
    fn decode(op: &str, args: Value) -> Result<Self, String> {
        match op {
            OP_GET_MACHINE_ID => expect_no_args(op, args).map(|()| Self::GetMachineId),
            OP_GET_DEFAULT_BACKUP_DIR => {
                expect_no_args(op, args).map(|()| Self::GetDefaultBackupDir)
            }
            OP_SAVE_BACKUP => {
                let args: SaveBackupArgs = serde_json::from_value(args)
                    .map_err(|e| format!("bad arguments for {op}: {e}"))?;
                Ok(Self::SaveBackup {
                    backup_id: args.backup_id,
                    json: args.json,
                    dir: args.dir,
                })
            }
            other => Err(format!("unknown operation {other:?}")),
        }
    }
}

fn expect_no_args(op: &str, args: Value) -> Result<(), String> {
    match args {
        Value::Null => Ok(()),
        Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(format!("{op} takes no arguments")),
    }
}

/// Reply sent back to page script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    /// Echo of the request id; `None` when the request was undecodable.
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeReply {
    fn value(id: u64, value: Value) -> Self {
        Self {
            id: Some(id),
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn rejected(id: Option<u64>, error: String) -> Self {
        Self {
            id,
            ok: false,
            value: None,
            error: Some(error),
        }
    }
}

/// Decode one message, run it against `bridge`, and build the reply.
pub fn dispatch(bridge: &dyn PrivilegedBridge, message: Value) -> BridgeReply {
    let id = message.get("id").and_then(Value::as_u64);

    let raw: RawRequest = match serde_json::from_value(message) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "malformed bridge message");
            return BridgeReply::rejected(id, format!("malformed request: {e}"));
        }
    };

    let request = match BridgeRequest::decode(&raw.op, raw.args) {
        Ok(request) => request,
        Err(e) => {
            warn!(op = %raw.op, error = %e, "bridge request rejected");
            return BridgeReply::rejected(Some(raw.id), e);
        }
    };

    debug!(id = raw.id, op = %raw.op, "bridge request");
    let value = match request {
        BridgeRequest::GetMachineId => Value::String(bridge.get_machine_id()),
        BridgeRequest::GetDefaultBackupDir => Value::String(bridge.get_default_backup_dir()),
        BridgeRequest::SaveBackup {
            backup_id,
            json,
            dir,
        } => {
            let response = bridge.save_backup(&backup_id, &json, dir.as_deref());
            match serde_json::to_value(response) {
                Ok(v) => v,
                Err(e) => return BridgeReply::rejected(Some(raw.id), e.to_string()),
            }
        }
    };
    BridgeReply::value(raw.id, value)
}

/// [`dispatch`] over a JSON string.
pub fn dispatch_str(bridge: &dyn PrivilegedBridge, message: &str) -> BridgeReply {
    match serde_json::from_str(message) {
        Ok(value) => dispatch(bridge, value),
        Err(e) => BridgeReply::rejected(None, format!("malformed request: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::SaveBackupResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records calls instead of touching the machine or disk.
    #[derive(Default)]
    struct RecordingBridge {
        saves: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl PrivilegedBridge for RecordingBridge {
        fn get_machine_id(&self) -> String {
            "abc123".into()
        }

        fn get_default_backup_dir(&self) -> String {
            "/home/owner/Documents/OmranBackups".into()
        }

        fn save_backup(&self, backup_id: &str, json: &str, dir: Option<&str>) -> SaveBackupResponse {
            self.saves.lock().unwrap().push((
                backup_id.to_owned(),
                json.to_owned(),
                dir.map(str::to_owned),
            ));
            SaveBackupResponse::failed("checksum mismatch: expected x, got y")
        }
    }

    #[test]
    fn get_machine_id() {
        let bridge = RecordingBridge::default();
        let reply = dispatch(&bridge, json!({ "id": 1, "op": "get-machine-id" }));
        assert_eq!(reply, BridgeReply::value(1, json!("abc123")));
    }

    #[test]
    fn get_default_backup_dir_accepts_empty_args() {
        let bridge = RecordingBridge::default();
        let reply = dispatch(&bridge, json!({ "id": 2, "op": "get-default-backup-dir", "args": {} }));
        assert!(reply.ok);
        assert_eq!(reply.value, Some(json!("/home/owner/Documents/OmranBackups")));
    }

    #[test]
    fn save_backup_passes_arguments_through() {
        let bridge = RecordingBridge::default();
        let reply = dispatch_str(
            &bridge,
            r#"{"id":3,"op":"save-backup","args":{"backupId":"b1","json":"{}","dir":null}}"#,
        );

        assert!(reply.ok);
        assert_eq!(
            reply.value,
            Some(json!({ "success": false, "error": "checksum mismatch: expected x, got y" }))
        );
        assert_eq!(
            bridge.saves.lock().unwrap().as_slice(),
            &[("b1".to_owned(), "{}".to_owned(), None)]
        );
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let bridge = RecordingBridge::default();
        let reply = dispatch(&bridge, json!({ "id": 4, "op": "read-file", "args": { "path": "/etc/passwd" } }));
        assert!(!reply.ok);
        assert_eq!(reply.id, Some(4));
        assert!(reply.error.unwrap().contains("unknown operation"));
    }

    #[test]
    fn extra_fields_are_rejected() {
        let bridge = RecordingBridge::default();
        let reply = dispatch(
            &bridge,
            json!({ "id": 5, "op": "save-backup", "args": { "backupId": "b", "json": "{}", "overwrite": true } }),
        );
        assert!(!reply.ok);
        assert!(bridge.saves.lock().unwrap().is_empty());

        let reply = dispatch(&bridge, json!({ "id": 6, "op": "get-machine-id", "sudo": true }));
        assert!(!reply.ok);
        assert_eq!(reply.id, Some(6));
    }

    #[test]
    fn arguments_on_nullary_ops_are_rejected() {
        let bridge = RecordingBridge::default();
        let reply = dispatch(&bridge, json!({ "id": 7, "op": "get-machine-id", "args": ["x"] }));
        assert!(!reply.ok);
    }

    #[test]
    fn garbage_never_panics() {
        let bridge = RecordingBridge::default();
        for raw in ["", "null", "[]", r#"{"op":"get-machine-id"}"#, r#"{"id":-1,"op":"x"}"#] {
            let reply = dispatch_str(&bridge, raw);
            assert!(!reply.ok, "{raw}");
        }
    }

    #[test]
    fn reply_serializes_without_empty_fields() {
        let reply = BridgeReply::value(9, json!("abc"));
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"id":9,"ok":true,"value":"abc"}"#
        );
    }
}
