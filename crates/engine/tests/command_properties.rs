use proptest::prelude::*;
use webmake_engine::command::{pair, ArgList, Command};

/// Adds one fixed set of arguments to a single bucket
fn fill_bucket(command: &mut Command, bucket: usize) {
    match bucket {
        0 => command.add_input("dub.ogg"),
        1 => {
            command.add_video_arg(pair("-c:v", "libvpx-vp9"));
            command.add_video_arg(pair("-crf", "40"));
        }
        2 => {
            command.add_video_filter(pair("crop", "640:360:0:0"));
            command.add_video_filter(pair("yadif", "0:-1:0"));
        }
        3 => {
            command.add_audio_arg(pair("-c:a", "libopus"));
            command.add_audio_arg(pair("-b:a", "96k"));
        }
        4 => command.add_audio_filter(pair("asetpts", "PTS-STARTPTS")),
        5 => command.add_map("0:v:0"),
        _ => {
            command.add_general_arg("-f", "webm");
            command.add_general_arg("-shortest", "");
        }
    }
}

fn position(args: &[String], needle: &str) -> usize {
    args.iter()
        .position(|a| a == needle)
        .unwrap_or_else(|| panic!("{} missing from {:?}", needle, args))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Rendering depends only on bucket contents, never on the order the
    /// buckets were filled in
    #[test]
    fn prop_bucket_order_is_fixed(order in Just((0..7).collect::<Vec<usize>>()).prop_shuffle()) {
        let mut canonical = Command::new();
        for bucket in 0..7 {
            fill_bucket(&mut canonical, bucket);
        }

        let mut shuffled = Command::new();
        for bucket in &order {
            fill_bucket(&mut shuffled, *bucket);
        }

        let args = shuffled.to_args();
        prop_assert_eq!(&args, &canonical.to_args());

        let checkpoints = ["-i", "-c:v", "-crf", "-filter_complex", "-c:a", "-map", "-f"];
        let positions: Vec<usize> = checkpoints.iter().map(|c| position(&args, c)).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]), "out of order: {:?}", args);
    }

    /// Keys stay unique and keep their first insertion slot
    #[test]
    fn prop_arg_list_keys_unique(
        ops in prop::collection::vec(("-[a-e]", "[0-9]{1,3}"), 1..40),
    ) {
        let mut list = ArgList::new();
        for (key, value) in &ops {
            list.set(key.clone(), value.clone());
        }

        let mut first_seen: Vec<&str> = Vec::new();
        for (key, _) in &ops {
            if !first_seen.contains(&key.as_str()) {
                first_seen.push(key);
            }
        }
        prop_assert_eq!(list.keys().collect::<Vec<_>>(), first_seen);

        for key in list.keys() {
            let last = ops.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
            prop_assert_eq!(list.get(key), last);
        }
    }

    /// Loop filters become pass-throughs in the analysis rendering and
    /// nothing else changes
    #[test]
    fn prop_analysis_args_only_neutralize_loops(audio_loop in any::<bool>()) {
        let mut command = Command::new();
        command.add_input("dub.ogg");
        command.add_video_arg(pair("-c:v", "libvpx-vp9"));
        command.add_video_filter(pair("scale", "-1:480:flags=lanczos"));
        if audio_loop {
            command.set_audio_filter_input(1);
            command.add_audio_filter(pair("asetpts", "PTS-STARTPTS"));
            command.add_audio_filter(pair("aloop", "loop=-1:size=2e+09"));
        } else {
            command.add_video_filter(pair("loop", "loop=-1:size=32767:start=0"));
        }
        command.add_general_arg("-shortest", "");

        let full = command.to_args();
        let analysis = command.to_analysis_args();
        prop_assert_eq!(full.len(), analysis.len());

        for (f, a) in full.iter().zip(&analysis) {
            if f == a {
                continue;
            }
            prop_assert!(f.contains("loop="));
            prop_assert!(!a.contains("loop"));
            prop_assert!(a.contains("null"));
        }
    }
}

#[test]
fn test_bare_flags_render_without_value() {
    let mut command = Command::new();
    command.add_general_arg("-shortest", "");
    command.add_general_arg("-f", "webm");
    assert_eq!(command.to_args(), vec!["-shortest", "-f", "webm"]);
    assert_eq!(command.to_string(), "-shortest -f webm");
}

#[test]
fn test_empty_command_renders_nothing() {
    let command = Command::new();
    assert!(command.to_args().is_empty());
    assert!(command.video_filter_graph().is_none());
    assert!(command.audio_filter_graph().is_none());
    assert!(!command.has_audio());
}
