//! End-to-end playback over real sequence files and PNG images on disk.

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use seqstim::core::{START_PLAYBACK, START_PRELOAD, TRIGGER_OVERLAY};
use seqstim::entities::{Loader, SeqFileSource};
use seqstim::{
    BlockInfo, Controller, DrawCommand, FeedbackConfig, Marker, MarkerSink, MarkerTable, PlaybackError,
    Renderer, Sources, Technical,
};

#[derive(Clone, Default)]
struct Markers(Arc<Mutex<Vec<Marker>>>);

impl Markers {
    fn values(&self) -> Vec<i32> {
        self.0.lock().unwrap().iter().map(|m| m.value()).collect()
    }

    fn count(&self, t: Technical) -> usize {
        self.0.lock().unwrap().iter().filter(|&&m| m == t.marker()).count()
    }
}

impl MarkerSink for Markers {
    fn send(&mut self, marker: Marker) {
        self.0.lock().unwrap().push(marker);
    }
}

#[derive(Clone, Default)]
struct Screen(Arc<Mutex<Vec<DrawCommand>>>);

impl Renderer for Screen {
    fn draw(&mut self, cmd: &DrawCommand) {
        self.0.lock().unwrap().push(cmd.clone());
    }
}

fn write_png(path: &Path, w: u32, h: u32) {
    RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255])).save(path).unwrap();
}

/// Two sequences sharing one image; markers by name and by number
fn stimulus_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    for name in ["a0", "a1", "a2", "b0"] {
        write_png(&dir.path().join("img").join(format!("{}.png", name)), 8, 6);
    }
    std::fs::write(
        dir.path().join("seqA.txt"),
        "# sequence A\nimg/a0.png\tcar_appears\nimg/a1.png\nimg/a2.png\t42\tunknown_thing\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("seqB.txt"), "img/b0.png\nimg/a0.png\n").unwrap();
    dir
}

fn table() -> MarkerTable {
    let mut t = MarkerTable::new();
    t.insert("car_appears", 10);
    t
}

fn controller(dir: &Path, config: FeedbackConfig) -> (Controller, Markers, Screen) {
    let markers = Markers::default();
    let screen = Screen::default();
    let sources = Sources::new(Arc::new(SeqFileSource::new(table())), Arc::new(Loader));
    let mut config = config;
    config.next_block_info = BlockInfo::from_pairs([
        (dir.join("seqA.txt").to_string_lossy().into_owned(), 10),
        (dir.join("seqB.txt").to_string_lossy().into_owned(), 5),
    ]);
    let ctl = Controller::new(config, sources, Box::new(markers.clone()), Box::new(screen.clone()));
    (ctl, markers, screen)
}

fn quick_config() -> FeedbackConfig {
    FeedbackConfig {
        sync_markers_enabled: false,
        playback_delay: 0.0,
        inter_sequence_delay: 1.0,
        preload_budget_ms: 10_000,
        ..Default::default()
    }
}

fn run_until_standby(ctl: &mut Controller, limit: usize) {
    for _ in 0..limit {
        ctl.tick().unwrap();
        if ctl.blocks_completed() > 0 {
            return;
        }
    }
    panic!("block did not finish within {} ticks", limit);
}

#[test]
fn full_block_marker_stream() {
    let dir = stimulus_dir();
    let (mut ctl, markers, _) = controller(dir.path(), quick_config());
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);

    run_until_standby(&mut ctl, 100);

    let mut expected = vec![200, 201, 202, 203, 204, 10, 42, 1, 205, 206, 203, 204, 205];
    assert_eq!(markers.values(), expected);

    // Next tick: fresh standby
    ctl.tick().unwrap();
    expected.push(200);
    assert_eq!(markers.values(), expected);
}

#[test]
fn marker_counts_match_sequence_count() {
    let dir = stimulus_dir();
    let (mut ctl, markers, _) = controller(dir.path(), quick_config());
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);
    run_until_standby(&mut ctl, 100);

    assert_eq!(markers.count(Technical::SeqStart), 2);
    assert_eq!(markers.count(Technical::SeqEnd), 2);
    assert_eq!(markers.count(Technical::StandbyStart), 1);
    assert_eq!(markers.count(Technical::StandbyEnd), 1);
    assert_eq!(markers.count(Technical::PreloadCompleted), 1);
    assert_eq!(markers.count(Technical::IntraBlockPauseStart), 1);
    assert!(ctl.state().is_standby());
}

#[test]
fn frames_are_centered_on_screen() {
    let dir = stimulus_dir();
    let (mut ctl, _, screen) = controller(dir.path(), quick_config());
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);
    ctl.tick().unwrap();
    ctl.tick().unwrap();
    ctl.tick().unwrap();

    let draws = screen.0.lock().unwrap();
    let layout = draws
        .iter()
        .find_map(|d| match d {
            DrawCommand::Image { layout, image } => Some((*layout, image.width())),
            _ => None,
        })
        .unwrap();
    assert_eq!(layout.1, 8);
    assert_eq!((layout.0.x, layout.0.y), ((1920 - 8) / 2, (1080 - 6) / 2));
}

#[test]
fn overlay_and_debug_text() {
    let dir = stimulus_dir();
    let mut config = quick_config();
    config.display_debug_information = true;
    config.overlay_duration = 10.0;
    let (mut ctl, _, screen) = controller(dir.path(), config);
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);
    ctl.tick().unwrap();
    ctl.tick().unwrap();

    ctl.push_control(TRIGGER_OVERLAY);
    screen.0.lock().unwrap().clear();
    ctl.tick().unwrap();

    let draws = screen.0.lock().unwrap();
    assert!(draws.iter().any(DrawCommand::is_overlay));
    let texts: Vec<&str> = draws
        .iter()
        .filter_map(|d| match d {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(texts.contains(&"Frame 0/3"));
    assert!(texts.contains(&"car_appears"));
}

#[test]
fn missing_image_aborts_to_standby() {
    let dir = stimulus_dir();
    std::fs::remove_file(dir.path().join("img").join("a1.png")).unwrap();
    let (mut ctl, markers, _) = controller(dir.path(), quick_config());
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);
    ctl.tick().unwrap();

    let err = ctl.tick().unwrap_err();
    assert!(matches!(err, PlaybackError::Load(_)));
    assert!(err.to_string().contains("a1.png"));
    assert!(ctl.state().is_standby());
    assert_eq!(markers.count(Technical::PreloadCompleted), 0);
}

#[test]
fn block_settings_dumped_on_playback_start() {
    let dir = stimulus_dir();
    let logs = tempfile::tempdir().unwrap();
    let mut config = quick_config();
    config.log_dir = Some(logs.path().to_path_buf());
    config.log_prefix_block = "subject01_block02".into();
    let (mut ctl, _, _) = controller(dir.path(), config);
    ctl.push_command(START_PRELOAD);
    ctl.push_command(START_PLAYBACK);
    ctl.tick().unwrap();
    ctl.tick().unwrap();

    let dumped = logs.path().join("subject01_block02_config.json");
    let saved = FeedbackConfig::load(&dumped).unwrap();
    assert_eq!(saved.next_block_info.len(), 2);
}

#[test]
fn pending_commands_survive_until_handled() {
    let dir = stimulus_dir();
    let (mut ctl, markers, _) = controller(dir.path(), quick_config());

    // start_playback in standby is not consumed there
    ctl.push_command(START_PLAYBACK);
    ctl.tick().unwrap();
    ctl.tick().unwrap();
    assert_eq!(ctl.commands().len(), 1);

    ctl.push_command(START_PRELOAD);
    ctl.tick().unwrap();
    assert_eq!(ctl.state_name(), "BlockPreload");
    ctl.tick().unwrap();
    assert_eq!(ctl.state_name(), "SequencePlayback");
    assert!(ctl.commands().is_empty());
    assert_eq!(markers.count(Technical::PreSeqStart), 1);
}
