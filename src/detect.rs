//! Language detection backends.
//! The service treats detection as an opaque, synchronous function from
//! normalized text to a language code; whatlang provides the statistics.

use whatlang::Lang;

/// Code reported when the backend cannot settle on any language.
pub const UNKNOWN_CODE: &str = "un";

/// Detector trait (adapter for different backends).
///
/// Implementations must be deterministic for identical input and must not
/// block on I/O; they run inline on the request task.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> String;
}

/// Any plain function or closure can stand in for a detector.
impl<F> LanguageDetector for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn detect(&self, text: &str) -> String {
        self(text)
    }
}

/// Trigram detector backed by the whatlang crate.
pub struct WhatlangDetector {
    detector: whatlang::Detector,
}

impl WhatlangDetector {
    pub fn new() -> Self {
        tracing::info!("initializing whatlang language detector");
        Self {
            detector: whatlang::Detector::new(),
        }
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for WhatlangDetector {
    /// Best guess even when whatlang flags it unreliable: short social posts
    /// rarely clear the reliability bar, and a guess beats "un" for them.
    fn detect(&self, text: &str) -> String {
        match self.detector.detect(text) {
            Some(info) => lang_to_code(info.lang()).to_string(),
            None => UNKNOWN_CODE.to_string(),
        }
    }
}

/// ISO 639-1 code for a whatlang language. Exhaustive over `Lang`.
pub fn lang_to_code(lang: Lang) -> &'static str {
    use whatlang::Lang::*;
    match lang {
        Afr => "af",
        Aka => "ak",
        Amh => "am",
        Ara => "ar",
        Aze => "az",
        Bel => "be",
        Ben => "bn",
        Bul => "bg",
        Cat => "ca",
        Ces => "cs",
        Cmn => "zh",
        Dan => "da",
        Deu => "de",
        Ell => "el",
        Eng => "en",
        Epo => "eo",
        Est => "et",
        Fin => "fi",
        Fra => "fr",
        Guj => "gu",
        Heb => "he",
        Hin => "hi",
        Hrv => "hr",
        Hye => "hy",
        Hun => "hu",
        Ind => "id",
        Ita => "it",
        Jav => "jv",
        Jpn => "ja",
        Kan => "kn",
        Kat => "ka",
        Khm => "km",
        Kor => "ko",
        Lat => "la",
        Lav => "lv",
        Lit => "lt",
        Mal => "ml",
        Mar => "mr",
        Mkd => "mk",
        Mya => "my",
        Nep => "ne",
        Nld => "nl",
        Nob => "no",
        Ori => "or",
        Pan => "pa",
        Pes => "fa",
        Pol => "pl",
        Por => "pt",
        Ron => "ro",
        Rus => "ru",
        Sin => "si",
        Slk => "sk",
        Slv => "sl",
        Sna => "sn",
        Spa => "es",
        Srp => "sr",
        Swe => "sv",
        Tam => "ta",
        Tel => "te",
        Tgl => "tl",
        Tha => "th",
        Tuk => "tk",
        Tur => "tr",
        Ukr => "uk",
        Urd => "ur",
        Uzb => "uz",
        Vie => "vi",
        Yid => "yi",
        Zul => "zu",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_long_unambiguous_sentences() {
        let d = WhatlangDetector::new();
        let cases = [
            (
                "this is a test of the emergency text categorizing system and it should be read as english ",
                "en",
            ),
            (
                "Och så ska vi prova lite svenska, som också borde fungera utan problem när texten är lång nog. ",
                "sv",
            ),
            (
                "Отец мой Андрей Петрович Гринев в молодости своей служил при графе Минихе и вышел в отставку ",
                "ru",
            ),
            ("私はガラスを食べられます。それは私を傷つけません。", "ja"),
            ("나는 유리를 먹을 수 있어요. 그래도 아프지 않아요", "ko"),
        ];
        for (text, expected) in cases {
            assert_eq!(d.detect(text), expected, "text: {text}");
        }
    }

    #[test]
    fn empty_text_is_unknown() {
        let d = WhatlangDetector::new();
        assert_eq!(d.detect(""), UNKNOWN_CODE);
    }

    #[test]
    fn deterministic() {
        let d = WhatlangDetector::new();
        let text = "Der schnelle braune Fuchs springt über den faulen Hund und läuft davon ";
        assert_eq!(d.detect(text), d.detect(text));
    }

    #[test]
    fn every_whatlang_language_has_a_two_letter_code() {
        let missing: Vec<String> = Lang::all()
            .iter()
            .map(|&l| (l, lang_to_code(l)))
            .filter(|(_, code)| code.len() != 2)
            .map(|(l, code)| format!("{l:?}->{code}"))
            .collect();
        assert!(missing.is_empty(), "unmapped languages: {missing:?}");
    }

    #[test]
    fn detects_armenian() {
        let d = WhatlangDetector::new();
        let text = "Բարեւ, ինչպես ես։ Ես սիրում եմ իմ քաղաքը եւ նրա հին փողոցները, որտեղ ամեն օր զբոսնում եմ ";
        assert_eq!(d.detect(text), "hy");
    }

    #[test]
    fn closures_are_detectors() {
        let fixed = |_: &str| "xx".to_string();
        assert_eq!(LanguageDetector::detect(&fixed, "anything"), "xx");
    }
}
