use std::fs;
use std::path::Path;

use voicebank_store::{source_fingerprint, DownloadCache};

const URL: &str = "https://www.reddit.com/r/audio/comments/abc123/clip/";

fn touch(path: &Path) {
    fs::write(path, b"audio").expect("should write cache file");
}

#[test]
fn stored_file_is_found_again() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = DownloadCache::new(tmp.path());

    let stem = cache.store_path_for(URL);
    let stored = stem.with_extension("mp3");
    touch(&stored);

    assert_eq!(cache.lookup(URL).expect("lookup"), Some(stored.clone()));
    // Whitespace around the source does not change the key.
    assert_eq!(cache.lookup(&format!(" {URL} ")).expect("lookup"), Some(stored));
}

#[test]
fn legacy_prefix_is_a_hit() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = DownloadCache::new(tmp.path());

    let legacy = tmp
        .path()
        .join(format!("youtube_{}.m4a", source_fingerprint(URL)));
    touch(&legacy);

    assert_eq!(cache.lookup(URL).expect("lookup"), Some(legacy));
}

#[test]
fn current_prefix_beats_legacy_prefix() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = DownloadCache::new(tmp.path());
    let fingerprint = source_fingerprint(URL);

    touch(&tmp.path().join(format!("youtube_{fingerprint}.aac")));
    let current = tmp.path().join(format!("source_{fingerprint}.webm"));
    touch(&current);

    assert_eq!(cache.lookup(URL).expect("lookup"), Some(current));
}

#[test]
fn first_extension_wins_and_non_audio_is_ignored() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = DownloadCache::new(tmp.path());
    let fingerprint = source_fingerprint(URL);

    touch(&tmp.path().join(format!("source_{fingerprint}.webm")));
    touch(&tmp.path().join(format!("source_{fingerprint}.m4a")));
    touch(&tmp.path().join(format!("source_{fingerprint}.json")));

    assert_eq!(
        cache.lookup(URL).expect("lookup"),
        Some(tmp.path().join(format!("source_{fingerprint}.m4a")))
    );
}

#[test]
fn other_sources_miss() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cache = DownloadCache::new(tmp.path());
    touch(&cache.store_path_for(URL).with_extension("mp3"));
    touch(&tmp.path().join(format!("source_{}.txt", source_fingerprint("other"))));

    assert_eq!(cache.lookup("other").expect("lookup"), None);
}
