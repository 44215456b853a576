// Ordered ffmpeg argument accumulator

use std::fmt;

/// A flag and its value. An empty value renders as a bare flag.
pub type ArgPair = (String, String);

pub fn pair(key: impl Into<String>, value: impl Into<String>) -> ArgPair {
    (key.into(), value.into())
}

/// Insertion-ordered list of key/value pairs with unique keys.
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    entries: Vec<ArgPair>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set_pair(&mut self, (key, value): ArgPair) {
        self.set(key, value);
    }

    pub fn extend(&mut self, pairs: impl IntoIterator<Item = ArgPair>) {
        for p in pairs {
            self.set_pair(p);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filters that repeat a stream forever and their pass-through stand-ins.
/// The first pass only gathers statistics and would never finish on them.
const LOOP_PASSTHROUGHS: [(&str, &str); 2] = [("loop", "null"), ("aloop", "anull")];

/// Per-category argument buckets for one ffmpeg invocation.
///
/// Buckets are always rendered in this order:
/// 1. extra inputs
/// 2. video codec args
/// 3. video filter graph
/// 4. audio codec args
/// 5. audio filter graph
/// 6. stream maps
/// 7. general args
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub(crate) inputs: ArgList,
    pub(crate) video_codec: ArgList,
    pub(crate) video_filters: ArgList,
    pub(crate) audio_codec: ArgList,
    pub(crate) audio_filters: ArgList,
    pub(crate) maps: ArgList,
    pub(crate) general: ArgList,
    /// Input index the audio filter graph reads from
    pub(crate) audio_filter_input: usize,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, path: impl Into<String>) {
        self.inputs.set(path, "");
    }

    pub fn add_map(&mut self, stream: impl Into<String>) {
        self.maps.set(stream, "");
    }

    pub fn add_general_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.general.set(key, value);
    }

    pub fn add_video_arg(&mut self, (key, value): ArgPair) {
        self.video_codec.set(key, value);
    }

    pub fn add_video_args(&mut self, args: impl IntoIterator<Item = ArgPair>) {
        self.video_codec.extend(args);
    }

    pub fn add_video_filter(&mut self, (name, value): ArgPair) {
        self.video_filters.set(name, value);
    }

    pub fn add_audio_arg(&mut self, (key, value): ArgPair) {
        self.audio_codec.set(key, value);
    }

    pub fn add_audio_filter(&mut self, (name, value): ArgPair) {
        self.audio_filters.set(name, value);
    }

    pub fn set_audio_filter_input(&mut self, index: usize) {
        self.audio_filter_input = index;
    }

    pub fn audio_filter_input(&self) -> usize {
        self.audio_filter_input
    }

    pub fn inputs(&self) -> &ArgList {
        &self.inputs
    }

    pub fn video_codec_args(&self) -> &ArgList {
        &self.video_codec
    }

    pub fn video_filters(&self) -> &ArgList {
        &self.video_filters
    }

    pub fn audio_codec_args(&self) -> &ArgList {
        &self.audio_codec
    }

    pub fn audio_filters(&self) -> &ArgList {
        &self.audio_filters
    }

    pub fn maps(&self) -> &ArgList {
        &self.maps
    }

    pub fn general_args(&self) -> &ArgList {
        &self.general
    }

    /// Whether any audio is encoded, filtered or mapped
    pub fn has_audio(&self) -> bool {
        !self.audio_codec.is_empty()
            || !self.audio_filters.is_empty()
            || self.maps.keys().any(|stream| stream.contains(":a"))
    }

    /// `[0:v]name=value,...` or None when no video filters were added
    pub fn video_filter_graph(&self) -> Option<String> {
        filter_graph("[0:v]", &self.video_filters, false)
    }

    /// `[N:a]name=value,...` or None when no audio filters were added
    pub fn audio_filter_graph(&self) -> Option<String> {
        let selector = format!("[{}:a]", self.audio_filter_input);
        filter_graph(&selector, &self.audio_filters, false)
    }

    /// Full argument list in bucket order
    pub fn to_args(&self) -> Vec<String> {
        self.render(false)
    }

    /// Argument list with looping filters swapped for pass-through filters
    pub fn to_analysis_args(&self) -> Vec<String> {
        self.render(true)
    }

    fn render(&self, neutralize_loops: bool) -> Vec<String> {
        let mut args = Vec::new();

        for path in self.inputs.keys() {
            args.push("-i".to_string());
            args.push(path.to_string());
        }

        push_pairs(&mut args, &self.video_codec);

        if let Some(graph) = filter_graph("[0:v]", &self.video_filters, neutralize_loops) {
            args.push("-filter_complex".to_string());
            args.push(graph);
        }

        push_pairs(&mut args, &self.audio_codec);

        let selector = format!("[{}:a]", self.audio_filter_input);
        if let Some(graph) = filter_graph(&selector, &self.audio_filters, neutralize_loops) {
            args.push("-filter_complex".to_string());
            args.push(graph);
        }

        for stream in self.maps.keys() {
            args.push("-map".to_string());
            args.push(stream.to_string());
        }

        push_pairs(&mut args, &self.general);

        args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_args().join(" "))
    }
}

fn push_pairs(args: &mut Vec<String>, list: &ArgList) {
    for (key, value) in list.iter() {
        args.push(key.to_string());
        if !value.is_empty() {
            args.push(value.to_string());
        }
    }
}

fn filter_graph(selector: &str, filters: &ArgList, neutralize_loops: bool) -> Option<String> {
    if filters.is_empty() {
        return None;
    }

    let chain: Vec<String> = filters
        .iter()
        .map(|(name, value)| {
            let passthrough = LOOP_PASSTHROUGHS
                .iter()
                .find(|(looping, _)| neutralize_loops && *looping == name);
            match passthrough {
                Some((_, replacement)) => replacement.to_string(),
                None if value.is_empty() => name.to_string(),
                None => format!("{}={}", name, value),
            }
        })
        .collect();

    Some(format!("{}{}", selector, chain.join(",")))
}
