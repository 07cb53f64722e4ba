//! Voice table for Kokoro TTS.
//!
//! Hotmic speaks English feedback, so only the English voices of the
//! multi-lang v1.0 model are listed.

/// Speaker table entry for one voice.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub speaker_id: i32,
    pub language: &'static str,
}

/// Bundled voices, ordered by name so lookups can bisect.
const VOICES: &[(&str, Voice)] = &[
    ("af_alloy", Voice { speaker_id: 0, language: "American English" }),
    ("af_aoede", Voice { speaker_id: 1, language: "American English" }),
    ("af_bella", Voice { speaker_id: 2, language: "American English" }),
    ("af_heart", Voice { speaker_id: 3, language: "American English" }),
    ("af_jessica", Voice { speaker_id: 4, language: "American English" }),
    ("af_kore", Voice { speaker_id: 5, language: "American English" }),
    ("af_nicole", Voice { speaker_id: 6, language: "American English" }),
    ("af_nova", Voice { speaker_id: 7, language: "American English" }),
    ("af_river", Voice { speaker_id: 8, language: "American English" }),
    ("af_sarah", Voice { speaker_id: 9, language: "American English" }),
    ("af_sky", Voice { speaker_id: 10, language: "American English" }),
    ("am_adam", Voice { speaker_id: 11, language: "American English" }),
    ("am_echo", Voice { speaker_id: 12, language: "American English" }),
    ("am_eric", Voice { speaker_id: 13, language: "American English" }),
    ("am_fenrir", Voice { speaker_id: 14, language: "American English" }),
    ("am_liam", Voice { speaker_id: 15, language: "American English" }),
    ("am_michael", Voice { speaker_id: 16, language: "American English" }),
    ("am_onyx", Voice { speaker_id: 17, language: "American English" }),
    ("am_puck", Voice { speaker_id: 18, language: "American English" }),
    ("am_santa", Voice { speaker_id: 19, language: "American English" }),
    ("bf_alice", Voice { speaker_id: 20, language: "British English" }),
    ("bf_emma", Voice { speaker_id: 21, language: "British English" }),
    ("bf_isabella", Voice { speaker_id: 22, language: "British English" }),
    ("bf_lily", Voice { speaker_id: 23, language: "British English" }),
    ("bm_daniel", Voice { speaker_id: 24, language: "British English" }),
    ("bm_fable", Voice { speaker_id: 25, language: "British English" }),
    ("bm_george", Voice { speaker_id: 26, language: "British English" }),
    ("bm_lewis", Voice { speaker_id: 27, language: "British English" }),
];

/// Look up a voice by its Kokoro name.
pub fn get_voice(name: &str) -> Option<&'static Voice> {
    VOICES.binary_search_by_key(&name, |(n, _)| n).ok().map(|idx| &VOICES[idx].1)
}

/// Print the voice table for --list-voices.
pub fn print_voices() {
    println!("Kokoro v1.0 English voices ({})", VOICES.len());

    for lang in ["American English", "British English"] {
        println!("\n{}:", lang);

        let mut entries: Vec<_> = VOICES.iter().filter(|(_, v)| v.language == lang).collect();
        entries.sort_by_key(|(_, v)| v.speaker_id);

        for (name, voice) in entries {
            println!("  {:<14} id {}", name, voice.speaker_id);
        }
    }

    println!("\nDefault: af_bella");
    println!("Usage:   hotmic --play-sounds --tts-voice af_bella");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_voice_known() {
        let voice = get_voice("af_bella").unwrap();
        assert_eq!(voice.speaker_id, 2);
        assert_eq!(voice.language, "American English");

        let voice = get_voice("bf_emma").unwrap();
        assert_eq!(voice.speaker_id, 21);
        assert_eq!(voice.language, "British English");
    }

    #[test]
    fn test_get_voice_unknown() {
        assert!(get_voice("zf_xiaobei").is_none());
        assert!(get_voice("").is_none());
    }

    #[test]
    fn test_voices_sorted_by_name() {
        // Binary search requires the table to stay sorted.
        for pair in VOICES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }
}
