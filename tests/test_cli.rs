// CLI integration tests for musicbridge
// Tests the command-line interface functionality

use std::process::{Command, Output};

/// Run the binary with an empty user config directory.
fn musicbridge(args: &[&str]) -> Output {
    let config_home = tempfile::tempdir().expect("temp dir");
    Command::new(env!("CARGO_BIN_EXE_musicbridge"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Test that --help flag shows help message with subcommands
#[test]
fn test_help_flag_shows_subcommands() {
    let output = musicbridge(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Help should exit with success");
    assert!(
        stdout.contains("musicbridge"),
        "Help should contain program name. Got: {}",
        stdout
    );
    for subcommand in ["config", "script", "library"] {
        assert!(
            stdout.contains(subcommand),
            "Help should list {} subcommand. Got: {}",
            subcommand,
            stdout
        );
    }
}

/// Command line overrides win over the settings file
#[test]
fn test_config_merges_file_and_overrides() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("bridge.toml");
    std::fs::write(
        &file,
        "app_name = \"from-file\"\napp_url = \"https://file.example.com\"\n",
    )
    .expect("write config");

    let output = musicbridge(&[
        "--config",
        file.to_str().unwrap(),
        "--app-url",
        "https://cli.example.com",
        "config",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("app_name = \"from-file\""), "Got: {}", stdout);
    assert!(stdout.contains("app_url = \"https://cli.example.com\""), "Got: {}", stdout);
}

/// Fire-and-forget operations inject the bare fragment
#[test]
fn test_script_play_prints_fragment() {
    let output = musicbridge(&["script", "play"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert_eq!(stdout.trim(), "music.player.play()");
}

/// Promise operations inject the fragment with its continuation
#[test]
fn test_script_queue_playlist_includes_continuation() {
    let output = musicbridge(&["script", "queue-playlist", "pl.123"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(
        stdout.starts_with("music.setQueue({ playlist: \"pl.123\" }).then(function(response)"),
        "Got: {}",
        stdout
    );
    assert!(stdout.contains("webkit.messageHandlers.success_"));
}

/// Listening attaches the listener with its registration id
#[test]
fn test_script_listen_attaches_listener() {
    let output = musicbridge(&["script", "listen", "playbackStateDidChange"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(
        stdout.starts_with("music.addEventListener(\"playbackStateDidChange\""),
        "Got: {}",
        stdout
    );
}

/// Invalid input exits with an error message
#[test]
fn test_script_rejects_unknown_repeat_mode() {
    let output = musicbridge(&["script", "repeat", "7"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("7 is not a valid repeat mode"), "Got: {}", stderr);
}

#[test]
fn test_library_requires_developer_token() {
    let output = musicbridge(&["library", "song", "i.abc"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("developer_token"), "Got: {}", stderr);
}

/// Library collections page through the runtime's API when no id is given
#[test]
fn test_script_library_collections() {
    let by_id = musicbridge(&["script", "albums", "l.a"]);
    let paged = musicbridge(&["script", "playlists", "--limit", "10"]);
    let by_id = String::from_utf8_lossy(&by_id.stdout);
    let paged = String::from_utf8_lossy(&paged.stdout);

    assert!(
        by_id.starts_with("music.api.library.albums([\"l.a\"], null).then("),
        "Got: {}",
        by_id
    );
    assert!(
        paged.starts_with("music.api.library.playlists(null, { limit: 10, offset: 0 }).then("),
        "Got: {}",
        paged
    );
}
