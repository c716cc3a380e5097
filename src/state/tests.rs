use super::*;
use crate::audio::LoudnessMeter;
use crate::config::LoudnessPresets;
use crate::rules::{ClipEndSignal, CommandQueue, Guard, LoudnessCondition, Polarity, RuleKind, RuleRegistry};
use crate::video::Selection;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Harness {
    rules: RuleRegistry,
    meter: LoudnessMeter,
    clip_end: ClipEndSignal,
    queue: CommandQueue,
}

fn harness() -> Harness {
    let meter = LoudnessMeter::new();
    let clip_end = ClipEndSignal::new();
    let queue = CommandQueue::new();
    let rules = RuleRegistry::new(meter.clone(), clip_end.clone(), queue.clone());
    Harness {
        rules,
        meter,
        clip_end,
        queue,
    }
}

fn builtin_with_assets() -> StateTable {
    let mut table = StateTable::builtin(&LoudnessPresets::default());
    for state in table.states_mut() {
        state.assets = match state.name.as_str() {
            "Idle" => vec![PathBuf::from("Idle/idle_1.mp4"), PathBuf::from("Idle/idle_2.mp4")],
            "Talking" => vec![PathBuf::from("Talking/talk_1.mp4")],
            "Emotes" => vec![
                PathBuf::from("Emotes/clip_wave.mp4"),
                PathBuf::from("Emotes/clip_jump.mov"),
            ],
            _ => Vec::new(),
        };
    }
    table
}

fn state<'a>(table: &'a StateTable, name: &str) -> &'a StateDef {
    let idx = table.index_of(name).expect("state defined");
    &table.states()[idx]
}

fn machine() -> StateMachine {
    StateMachine::new(builtin_with_assets(), "Idle", "Idle").expect("builtin table")
}

#[test]
fn builtin_table_matches_default_presets() {
    let table = StateTable::builtin(&LoudnessPresets::default());
    let names: Vec<&str> = table.states().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Idle", "Talking", "Emotes"]);

    let idle = state(&table, "Idle");
    assert_eq!(idle.policy, VideoPolicy::Random);
    assert_eq!(idle.transitions[0].target, "Talking");
    assert_eq!(
        idle.transitions[0].guard,
        Guard::Loudness(LoudnessCondition::new(0.2, 0.0, Polarity::Above))
    );
    assert_eq!(idle.transitions[1].guard, Guard::Command);

    let talking = state(&table, "Talking");
    assert_eq!(
        talking.transitions[0].guard,
        Guard::Loudness(LoudnessCondition::new(0.2, 1.0, Polarity::Below))
    );

    let emotes = state(&table, "Emotes");
    assert_eq!(emotes.policy, VideoPolicy::Specific);
    assert_eq!(emotes.transitions[0].guard, Guard::Inactivity);
    assert_eq!(table.rule_kinds(), RuleKind::ALL.to_vec());
}

#[test]
fn yaml_table_resolves_rules_and_aliases() {
    let table = StateTable::from_yaml_str(
        r#"
states:
  - name: Rest
    transitions:
      - target: Speak
        rule: loudness
        config: { threshold: 0.3, duration: 0.5, polarity: POSITIVE }
  - name: Speak
    policy: random
    transitions:
      - target: Rest
        rule: MIC
        config: { threshold: 0.1, duration: 2, polarity: below }
"#,
    )
    .expect("valid table");

    assert_eq!(table.states().len(), 2);
    assert_eq!(table.states()[0].policy, VideoPolicy::Random);
    assert_eq!(
        table.states()[0].transitions[0].guard,
        Guard::Loudness(LoudnessCondition::new(0.3, 0.5, Polarity::Above))
    );
    assert_eq!(
        table.states()[1].transitions[0].guard,
        Guard::Loudness(LoudnessCondition::new(0.1, 2.0, Polarity::Below))
    );
    assert_eq!(table.rule_kinds(), vec![RuleKind::Loudness]);
}

#[test]
fn yaml_table_rejects_unknown_rule() {
    let err = StateTable::from_yaml_str(
        "states:\n  - name: Idle\n    transitions:\n      - { target: Idle, rule: KEYBOARD }\n",
    )
    .expect_err("unknown rule");
    assert!(format!("{err:#}").contains("unknown rule 'KEYBOARD'"));
}

#[test]
fn yaml_loudness_rule_requires_config() {
    let err = StateTable::from_yaml_str(
        "states:\n  - name: Idle\n    transitions:\n      - { target: Idle, rule: MIC }\n",
    )
    .expect_err("missing config");
    assert!(format!("{err:#}").contains("needs a config"));
}

#[test]
fn table_rejects_duplicates_and_empty() {
    assert!(StateTable::from_yaml_str("states: []\n").is_err());
    assert!(StateTable::from_yaml_str("states:\n  - name: A\n  - name: A\n").is_err());
}

#[test]
fn table_accepts_unknown_target() {
    let table = StateTable::from_yaml_str(
        "states:\n  - name: Idle\n    transitions:\n      - { target: Nowhere, rule: Inactivity }\n",
    )
    .expect("unknown targets are resolved at runtime");
    assert_eq!(table.states()[0].transitions[0].target, "Nowhere");
}

#[test]
fn load_reads_file_with_context() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("states.yaml");
    fs::write(&path, "states:\n  - name: Only\n    policy: specific\n").expect("write");
    let table = StateTable::load(&path).expect("load");
    assert_eq!(table.states()[0].policy, VideoPolicy::Specific);

    let err = StateTable::load(&dir.path().join("missing.yaml")).expect_err("missing");
    assert!(format!("{err:#}").contains("failed to read state table"));
}

#[test]
fn machine_rejects_unknown_initial_state() {
    let err = StateMachine::new(builtin_with_assets(), "Sleeping", "Idle").expect_err("unknown");
    assert!(err.to_string().contains("Sleeping"));
}

#[test]
fn asset_scan_filters_sorts_and_skips_subdirs() {
    let dir = TempDir::new().expect("tempdir");
    let idle = dir.path().join("Idle");
    fs::create_dir_all(idle.join("nested")).expect("mkdir");
    for name in ["b.MP4", "a.mov", "notes.txt", "c.mkv", "nested/deep.mp4"] {
        fs::write(idle.join(name), b"x").expect("write");
    }
    let files = scan_state_dir(&idle).expect("scan");
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.mov", "b.MP4", "c.mkv"]);
}

#[test]
fn missing_asset_folder_leaves_state_empty() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("Idle")).expect("mkdir");
    fs::write(dir.path().join("Idle").join("idle.avi"), b"x").expect("write");

    let mut table = StateTable::builtin(&LoudnessPresets::default());
    load_assets(&mut table, dir.path());
    assert_eq!(state(&table, "Idle").assets.len(), 1);
    assert!(state(&table, "Talking").assets.is_empty());
    assert!(state(&table, "Emotes").assets.is_empty());
}

#[test]
fn request_tokens_resolve_by_stem_or_name() {
    let assets = vec![
        PathBuf::from("Emotes/clip_wave.mp4"),
        PathBuf::from("Emotes/Clip_Jump.mov"),
    ];
    assert_eq!(resolve_request(&assets, "clip_wave"), assets[0]);
    assert_eq!(resolve_request(&assets, "clip_jump"), assets[1]);
    assert_eq!(resolve_request(&assets, "clip_wave.mp4"), assets[0]);
    assert_eq!(resolve_request(&assets, "other.mp4"), PathBuf::from("other.mp4"));
}

#[test]
fn idle_talking_idle_follows_loudness() {
    let h = harness();
    let mut machine = machine();
    let base = Instant::now();
    let mut switches = Vec::new();

    // 1.2 s of speech, then 1.2 s of silence, ticking every 30 ms.
    for step in 0..80u64 {
        let at = step * 30;
        h.meter.set(if at < 1200 { 0.3 } else { 0.05 });
        if machine.tick(&h.rules, base + Duration::from_millis(at)).is_some() {
            switches.push((at, machine.current_name().to_string()));
        }
    }

    assert_eq!(switches.len(), 2, "{switches:?}");
    assert_eq!(switches[0], (30, "Talking".to_string()));
    assert_eq!(switches[1].1, "Idle");
    // silence starts at 1200 ms and must last a full second
    assert!(switches[1].0 >= 2200 && switches[1].0 <= 2230, "{switches:?}");
}

#[test]
fn switching_to_random_state_picks_from_its_own_assets() {
    let mut machine = machine();
    let selection = machine.switch_state("Talking");
    assert_eq!(selection, Selection::Random(vec![PathBuf::from("Talking/talk_1.mp4")]));
    assert_eq!(machine.current_name(), "Talking");
}

#[test]
fn command_switches_to_emotes_with_requested_clip() {
    let h = harness();
    let mut machine = machine();
    h.queue.push("clip_wave");

    let selection = machine.tick(&h.rules, Instant::now()).expect("switch");
    assert_eq!(machine.current_name(), "Emotes");
    assert_eq!(machine.requested(), Some("clip_wave"));
    assert_eq!(selection, Selection::Specific(PathBuf::from("Emotes/clip_wave.mp4")));
}

#[test]
fn commands_drain_one_per_firing_tick() {
    let h = harness();
    let mut machine = machine();
    h.queue.push("clip_wave");
    h.queue.push("clip_jump");

    machine.tick(&h.rules, Instant::now()).expect("first");
    assert_eq!(h.queue.len(), 1);

    h.clip_end.raise();
    machine.tick(&h.rules, Instant::now()).expect("back to idle");
    assert_eq!(machine.current_name(), "Idle");

    let selection = machine.tick(&h.rules, Instant::now()).expect("second");
    assert_eq!(selection, Selection::Specific(PathBuf::from("Emotes/clip_jump.mov")));
    assert!(h.queue.is_empty());
}

#[test]
fn first_firing_transition_wins_and_later_rules_are_skipped() {
    let h = harness();
    let mut machine = machine();
    let base = Instant::now();
    h.meter.set(0.5);
    // loudness only records its onset; the command transition still fires
    h.queue.push("clip_wave");
    machine.tick(&h.rules, base).expect("command fires");
    assert_eq!(machine.current_name(), "Emotes");
    assert!(h.queue.is_empty());

    let h = harness();
    let mut machine = self::machine();
    h.meter.set(0.5);
    assert!(machine.tick(&h.rules, base).is_none());
    // the completed loudness run is listed first and leaves the token queued
    h.queue.push("clip_wave");
    let selection = machine.tick(&h.rules, base + Duration::from_millis(30)).expect("talk");
    assert_eq!(machine.current_name(), "Talking");
    assert!(matches!(selection, Selection::Random(_)));
    assert_eq!(h.queue.len(), 1);
}

#[test]
fn loudness_run_does_not_survive_leaving_the_state() {
    let h = harness();
    let mut machine = machine();
    let base = Instant::now();
    h.meter.set(0.5);
    h.queue.push("clip_wave");
    machine.tick(&h.rules, base).expect("emote");
    h.clip_end.raise();
    machine.tick(&h.rules, base + Duration::from_millis(30)).expect("idle");
    assert_eq!(machine.current_name(), "Idle");

    // back in Idle the run starts over
    assert!(machine.tick(&h.rules, base + Duration::from_millis(60)).is_none());
    machine.tick(&h.rules, base + Duration::from_millis(90)).expect("talk");
    assert_eq!(machine.current_name(), "Talking");
}

#[test]
fn two_loudness_transitions_in_one_state_both_fire() {
    let h = harness();
    let table = StateTable::from_yaml_str(
        r#"
states:
  - name: Rest
    transitions:
      - target: Shout
        rule: MIC
        config: { threshold: 0.5, duration: 0.1 }
      - target: Talk
        rule: MIC
        config: { threshold: 0.2, duration: 0.1 }
  - name: Shout
  - name: Talk
"#,
    )
    .expect("valid table");
    let mut machine = StateMachine::new(table, "Rest", "Rest").expect("machine");
    let base = Instant::now();
    h.meter.set(0.3);
    let mut switched_at = None;
    for step in 0..20u64 {
        let at = step * 30;
        if machine.tick(&h.rules, base + Duration::from_millis(at)).is_some() {
            switched_at = Some(at);
            break;
        }
    }
    assert_eq!(switched_at, Some(120));
    assert_eq!(machine.current_name(), "Talk");
}

#[test]
fn unknown_target_falls_back_to_default_state() {
    let h = harness();
    let mut states = builtin_with_assets().states().to_vec();
    states[0].transitions = vec![Transition::new("Dancing", Guard::Inactivity)];
    let table = StateTable::from_states(states).expect("table");
    let mut machine = StateMachine::new(table, "Idle", "Talking").expect("machine");

    h.clip_end.raise();
    let selection = machine.tick(&h.rules, Instant::now()).expect("fallback");
    assert_eq!(machine.current_name(), "Talking");
    assert_eq!(selection, Selection::Random(vec![PathBuf::from("Talking/talk_1.mp4")]));
}

#[test]
fn specific_state_without_request_selects_nothing() {
    let mut machine = machine();
    assert_eq!(machine.switch_state("Emotes"), Selection::Nothing);
    machine.request_video("clip_jump");
    assert_eq!(machine.current_name(), "Emotes");
    assert_eq!(
        machine.selection(),
        Selection::Specific(PathBuf::from("Emotes/clip_jump.mov"))
    );
}

#[test]
fn random_state_with_no_assets_selects_empty_list() {
    let mut machine = StateMachine::new(
        StateTable::builtin(&LoudnessPresets::default()),
        "Idle",
        "Idle",
    )
    .expect("machine");
    assert_eq!(machine.switch_state("Talking"), Selection::Random(Vec::new()));
}
