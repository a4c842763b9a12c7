//! FPP REST API paths and payloads.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

pub const STATUS_PATH: &str = "/api/fppd/status";
pub const PLAYABLE_PLAYLISTS_PATH: &str = "/api/playlists/playable";
pub const COMMAND_PATH: &str = "/api/command";
pub const STOP_PATH: &str = "/api/playlists/stop";
pub const RESUME_PATH: &str = "/api/playlists/resume";
pub const PAUSE_PATH: &str = "/api/playlists/pause";

pub const NEXT_PLAYLIST_ITEM: &str = "Next Playlist Item";
pub const PREV_PLAYLIST_ITEM: &str = "Prev Playlist Item";

/// `GET /api/playlist/{name}/start`
pub fn playlist_start_path(name: &str) -> String {
    format!("/api/playlist/{}/start", urlencoding::encode(name))
}

/// `GET /api/command/{name}`, for commands that take no arguments
pub fn named_command_path(name: &str) -> String {
    format!("{}/{}", COMMAND_PATH, urlencoding::encode(name))
}

/// Response of `GET /api/fppd/status`.
///
/// Only the fields the player uses. Depending on the FPP version, counters
/// arrive either as numbers or as numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FppdStatus {
    #[serde(default)]
    pub status_name: String,

    /// Volume in percent
    #[serde(default, deserialize_with = "lenient_u64")]
    pub volume: u64,

    /// Sequence file name, e.g. `show.fseq`. Empty when no sequence runs.
    #[serde(default)]
    pub current_sequence: Option<String>,

    /// Media file name, set for media-only playlist entries
    #[serde(default)]
    pub current_song: Option<String>,

    #[serde(default)]
    pub current_playlist: Option<CurrentPlaylist>,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub seconds_played: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub seconds_remaining: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CurrentPlaylist {
    #[serde(default)]
    pub playlist: Option<String>,
}

impl FppdStatus {
    /// Title of the running item: the sequence name without its extension,
    /// or the song when no sequence is active.
    pub fn title(&self) -> Option<String> {
        match non_empty(&self.current_sequence) {
            Some(sequence) => Some(strip_extension(sequence).to_string()),
            None => non_empty(&self.current_song).map(str::to_string),
        }
    }

    /// Name of the running playlist
    pub fn playlist(&self) -> Option<String> {
        self.current_playlist
            .as_ref()
            .and_then(|p| non_empty(&p.playlist))
            .map(str::to_string)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Accept a JSON number, a numeric string, or null (as 0)
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative number, got {}", n))),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", s, e))),
        Some(other) => Err(D::Error::custom(format!(
            "expected a number, got {}",
            other
        ))),
    }
}

/// Body of `POST /api/command`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub command: String,
    pub args: Vec<serde_json::Value>,
}

impl Command {
    pub fn volume_set(percent: u8) -> Self {
        Self {
            command: "Volume Set".to_string(),
            args: vec![serde_json::json!(percent)],
        }
    }

    pub fn volume_increase() -> Self {
        Self {
            command: "Volume Increase".to_string(),
            args: vec![serde_json::json!("1")],
        }
    }

    pub fn volume_decrease() -> Self {
        Self {
            command: "Volume Decrease".to_string(),
            args: vec![serde_json::json!("1")],
        }
    }

    /// Ask FPP to publish `value` on an MQTT topic
    pub fn mqtt(topic: &str, value: u8) -> Self {
        Self {
            command: "MQTT".to_string(),
            args: vec![serde_json::json!(topic), serde_json::json!(value)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_playing_payload() {
        let status: FppdStatus = serde_json::from_value(serde_json::json!({
            "status_name": "playing",
            "volume": 70,
            "current_sequence": "foo.fseq",
            "current_song": "",
            "current_playlist": {"playlist": "Show1", "index": "1", "count": "4"},
            "seconds_played": "10",
            "seconds_remaining": 50,
            "time_elapsed": "00:10"
        }))
        .unwrap();

        assert_eq!(status.status_name, "playing");
        assert_eq!(status.volume, 70);
        assert_eq!(status.seconds_played, 10);
        assert_eq!(status.seconds_remaining, 50);
        assert_eq!(status.title().as_deref(), Some("foo"));
        assert_eq!(status.playlist().as_deref(), Some("Show1"));
    }

    #[test]
    fn test_status_minimal_payload() {
        let status: FppdStatus =
            serde_json::from_value(serde_json::json!({"status_name": "idle"})).unwrap();
        assert_eq!(status.volume, 0);
        assert_eq!(status.title(), None);
        assert_eq!(status.playlist(), None);
    }

    #[test]
    fn test_status_nulls_and_empty_strings() {
        let status: FppdStatus = serde_json::from_value(serde_json::json!({
            "status_name": "idle",
            "volume": null,
            "current_sequence": null,
            "current_playlist": {"playlist": ""},
            "seconds_played": ""
        }))
        .unwrap();
        assert_eq!(status.volume, 0);
        assert_eq!(status.seconds_played, 0);
        assert_eq!(status.playlist(), None);
    }

    #[test]
    fn test_status_rejects_garbage_counter() {
        let result = serde_json::from_value::<FppdStatus>(serde_json::json!({
            "status_name": "playing",
            "seconds_played": "ten"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_title_falls_back_to_song() {
        let status = FppdStatus {
            current_sequence: Some(String::new()),
            current_song: Some("jingle.mp3".to_string()),
            ..Default::default()
        };
        assert_eq!(status.title().as_deref(), Some("jingle.mp3"));
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("foo.fseq"), "foo");
        assert_eq!(strip_extension("my.show.fseq"), "my.show");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }

    #[test]
    fn test_paths_are_encoded() {
        assert_eq!(playlist_start_path("Show1"), "/api/playlist/Show1/start");
        assert_eq!(
            playlist_start_path("Main Show/2"),
            "/api/playlist/Main%20Show%2F2/start"
        );
        assert_eq!(
            named_command_path(NEXT_PLAYLIST_ITEM),
            "/api/command/Next%20Playlist%20Item"
        );
    }

    #[test]
    fn test_command_bodies() {
        insta::assert_snapshot!(
            serde_json::to_string(&Command::volume_set(50)).unwrap(),
            @r#"{"command":"Volume Set","args":[50]}"#
        );
        insta::assert_snapshot!(
            serde_json::to_string(&Command::volume_increase()).unwrap(),
            @r#"{"command":"Volume Increase","args":["1"]}"#
        );
        insta::assert_snapshot!(
            serde_json::to_string(&Command::volume_decrease()).unwrap(),
            @r#"{"command":"Volume Decrease","args":["1"]}"#
        );
        insta::assert_snapshot!(
            serde_json::to_string(&Command::mqtt("fpp/falcon/player/FPP/playlist/repeat/set", 1)).unwrap(),
            @r#"{"command":"MQTT","args":["fpp/falcon/player/FPP/playlist/repeat/set",1]}"#
        );
    }
}
