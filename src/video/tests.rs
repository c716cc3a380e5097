use super::testing::{read_stamp, ScriptedClipSource};
use super::*;
use crate::rules::ClipEndSignal;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

const CONFIG: PlayerConfig = PlayerConfig {
    width: 16,
    height: 12,
    end_cutoff: 20,
};

fn player(source: ScriptedClipSource) -> (VideoPlayer<ScriptedClipSource>, ClipEndSignal) {
    let clip_end = ClipEndSignal::new();
    let player = VideoPlayer::with_rng(source, CONFIG, clip_end.clone(), StdRng::seed_from_u64(7));
    (player, clip_end)
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn near_end_window_covers_last_cutoff_frames() {
    let near: Vec<u64> = (0..100)
        .filter(|&pos| is_near_end(pos, Some(100), 20))
        .collect();
    assert_eq!(near, (80..100).collect::<Vec<_>>());
    assert!(!is_near_end(0, None, 20));
    assert!(!is_near_end(0, Some(0), 20));
    // Clips shorter than the cutoff are "near end" from the start.
    assert!(is_near_end(0, Some(10), 20));
}

#[test]
fn no_clip_means_no_frame() {
    let (mut player, clip_end) = player(ScriptedClipSource::new());
    assert!(player.next_frame().is_none());
    assert!(!player.take_transition_cue());
    assert!(!clip_end.is_raised());
}

#[test]
fn hands_off_to_new_clip_at_cutoff() {
    let source = ScriptedClipSource::new().with_clip("Idle/a.mp4", 1, 100);
    let (mut player, clip_end) = player(source.clone());
    player.select(Selection::Random(paths(&["Idle/a.mp4"])));

    for expected in 0..80 {
        let frame = player.next_frame().expect("frame");
        assert_eq!(read_stamp(&frame), (1, expected));
        assert!(!player.take_transition_cue());
    }
    assert!(!clip_end.is_raised());

    // Position 80 is inside the cutoff: the fresh clip's first frame comes back
    // instead of frame 80 of the old one.
    let frame = player.next_frame().expect("frame after hand-off");
    assert_eq!(read_stamp(&frame), (1, 0));
    assert!(player.take_transition_cue());
    assert!(clip_end.take());
    assert_eq!(source.opened().len(), 2);

    let frame = player.next_frame().expect("frame");
    assert_eq!(read_stamp(&frame), (1, 1));
}

#[test]
fn exhausted_unindexed_clip_triggers_reselection() {
    let source = ScriptedClipSource::new().with_unindexed_clip("Idle/a.mkv", 4, 3);
    let (mut player, clip_end) = player(source);
    player.select(Selection::Random(paths(&["Idle/a.mkv"])));
    for expected in 0..3 {
        assert_eq!(read_stamp(&player.next_frame().unwrap()), (4, expected));
    }
    assert!(!clip_end.is_raised());
    assert_eq!(read_stamp(&player.next_frame().unwrap()), (4, 0));
    assert!(clip_end.is_raised());
    assert!(player.take_transition_cue());
}

#[test]
fn random_selection_stays_within_candidates() {
    let source = ScriptedClipSource::new()
        .with_clip("Idle/a.mp4", 1, 50)
        .with_clip("Idle/b.mp4", 2, 50)
        .with_clip("Talking/c.mp4", 3, 50);
    let (mut player, _) = player(source);
    let idle = paths(&["Idle/a.mp4", "Idle/b.mp4"]);
    for _ in 0..50 {
        let chosen = player
            .select_random(&idle)
            .expect("open")
            .expect("selected")
            .to_path_buf();
        assert!(idle.contains(&chosen));
    }
}

#[test]
fn empty_candidate_list_is_not_an_error() {
    let source = ScriptedClipSource::new().with_clip("Idle/a.mp4", 1, 50);
    let (mut player, clip_end) = player(source);
    player.select(Selection::Random(paths(&["Idle/a.mp4"])));
    assert!(player.current_path().is_some());

    assert!(player.select_random(&[]).expect("no error").is_none());
    assert!(player.current_path().is_none());
    assert!(player.next_frame().is_none());
    assert!(!clip_end.is_raised());
}

#[test]
fn invalid_specific_clip_reports_error_and_yields_no_frame() {
    let (mut player, clip_end) = player(ScriptedClipSource::new());
    assert!(player.select_specific(Path::new("clip_missing")).is_err());
    assert!(player.next_frame().is_none());

    player.select(Selection::Specific(PathBuf::from("clip_missing")));
    assert!(player.next_frame().is_none());
    assert!(clip_end.take());
}

#[test]
fn failed_random_pick_is_retried_on_next_frame() {
    let source = ScriptedClipSource::new().with_clip("Idle/good.mp4", 9, 50);
    let (mut player, _) = player(source);
    let candidates = paths(&["Idle/broken.mp4", "Idle/good.mp4"]);
    player.select(Selection::Random(candidates));
    // Keep asking until the retry lands on the decodable clip.
    let frame = (0..64).find_map(|_| player.next_frame());
    assert_eq!(frame.map(|f| read_stamp(&f).0), Some(9));
}

#[test]
fn specific_selection_replays_same_clip_at_end() {
    let source = ScriptedClipSource::new()
        .with_clip("Emotes/clip_wave.mp4", 5, 22)
        .with_clip("Emotes/other.mp4", 6, 22);
    let (mut player, clip_end) = player(source.clone());
    player.select(Selection::Specific(PathBuf::from("Emotes/clip_wave.mp4")));
    // 22 frames with a cutoff of 20: frames 0 and 1 play, then the hand-off.
    assert_eq!(read_stamp(&player.next_frame().unwrap()), (5, 0));
    assert_eq!(read_stamp(&player.next_frame().unwrap()), (5, 1));
    assert_eq!(read_stamp(&player.next_frame().unwrap()), (5, 0));
    assert!(clip_end.is_raised());
    assert!(source
        .opened()
        .iter()
        .all(|path| path == Path::new("Emotes/clip_wave.mp4")));
}

#[test]
fn frames_are_resized_to_output_resolution() {
    let source = ScriptedClipSource::new().with_clip("Idle/a.mp4", 1, 50);
    let (mut player, _) = player(source);
    player.select(Selection::Random(paths(&["Idle/a.mp4"])));
    let frame = player.next_frame().unwrap();
    assert_eq!(frame.dimensions(), (CONFIG.width, CONFIG.height));
}

#[test]
fn selecting_nothing_releases_clip() {
    let source = ScriptedClipSource::new().with_clip("Idle/a.mp4", 1, 50);
    let (mut player, _) = player(source);
    player.select(Selection::Random(paths(&["Idle/a.mp4"])));
    assert!(player.next_frame().is_some());
    player.select(Selection::Nothing);
    assert!(player.current_path().is_none());
    assert!(player.next_frame().is_none());
}

#[test]
fn frame_resize_samples_nearest_pixel() {
    let mut frame = Frame::black(2, 2);
    frame.set_pixel(1, 0, [255, 0, 0]);
    frame.set_pixel(0, 1, [0, 255, 0]);
    let big = frame.resized(4, 4);
    assert_eq!(big.dimensions(), (4, 4));
    assert_eq!(big.pixel(3, 0), [255, 0, 0]);
    assert_eq!(big.pixel(2, 1), [255, 0, 0]);
    assert_eq!(big.pixel(0, 3), [0, 255, 0]);
    assert_eq!(big.pixel(0, 0), [0, 0, 0]);
}

#[test]
fn frame_from_rgb_checks_length() {
    assert!(Frame::from_rgb(2, 2, vec![0; 12]).is_some());
    assert!(Frame::from_rgb(2, 2, vec![0; 11]).is_none());
}

#[test]
fn frame_packs_0rgb_words() {
    let frame = Frame::filled(1, 1, [0x12, 0x34, 0x56]);
    assert_eq!(frame.to_0rgb(), vec![0x0012_3456]);
}

#[test]
fn state_switch_discards_stale_end_signal() {
    let source = ScriptedClipSource::new().with_clip("Emotes/clip_wave.mp4", 3, 30);
    let (mut player, clip_end) = player(source);
    clip_end.raise();
    player.select(Selection::Specific(PathBuf::from("Emotes/clip_wave.mp4")));
    assert!(!clip_end.is_raised());
    assert!(player.next_frame().is_some());
}
