//! Canonicalization of scraped Persian/Arabic text.
//!
//! Forum posts mix Arabic and Persian letter forms, presentation-form glyphs copied from PDFs,
//! three digit systems, tashkeel and zero-width marks. [`Normalizer`] folds all of that onto
//! one Persian/Latin form so that equal questions compare (and embed) equally.
//!
//! The rewrite is a single pass over the input: every character is looked up in
//! [`MAPPINGS`] and replaced by zero, one or two characters; anything not in the table is
//! copied through untouched.
use std::collections::HashMap;

/// The canonical Persian alphabet plus space.
///
/// Documentation only: normalized text may contain other characters, since unmapped input
/// passes through unchanged. Every replacement in [`MAPPINGS`] is drawn from this set or from
/// ASCII, which is what makes normalization idempotent.
pub const PERSIAN_ALPHABET: &str = "آابپتثجچحخدذرزژسشصضطظعغفقکگلمنوهیء ";

/// Source code point to replacement text.
pub const MAPPINGS: &[(char, &str)] = &[
    // Arabic letter variants
    ('\u{0623}', "ا"), ('\u{0625}', "ا"), ('\u{0671}', "ا"), ('\u{0672}', "ا"), ('\u{0673}', "ا"), ('\u{0675}', "ا"), // alef with hamza/wasla/wavy hamza
    ('\u{0624}', "و"), ('\u{0676}', "و"), // waw with hamza
    ('\u{0626}', "ی"), ('\u{0649}', "ی"), ('\u{064A}', "ی"), ('\u{06CD}', "ی"), ('\u{06D0}', "ی"), // arabic yeh, alef maksura
    ('\u{0629}', "ه"), ('\u{06C0}', "ه"), ('\u{06C1}', "ه"), ('\u{06BE}', "ه"), ('\u{06D5}', "ه"), // teh marbuta, heh variants
    ('\u{0643}', "ک"), ('\u{06AA}', "ک"), // arabic kaf, swash kaf

    // Arabic Presentation Forms-A: Persian letters
    ('\u{FB50}', "ا"), ('\u{FB51}', "ا"), // alef wasla
    ('\u{FB56}', "پ"), ('\u{FB57}', "پ"), ('\u{FB58}', "پ"), ('\u{FB59}', "پ"), // peh
    ('\u{FB7A}', "چ"), ('\u{FB7B}', "چ"), ('\u{FB7C}', "چ"), ('\u{FB7D}', "چ"), // tcheh
    ('\u{FB8A}', "ژ"), ('\u{FB8B}', "ژ"), // jeh
    ('\u{FB8E}', "ک"), ('\u{FB8F}', "ک"), ('\u{FB90}', "ک"), ('\u{FB91}', "ک"), // keheh
    ('\u{FB92}', "گ"), ('\u{FB93}', "گ"), ('\u{FB94}', "گ"), ('\u{FB95}', "گ"), // gaf
    ('\u{FBA4}', "ه"), ('\u{FBA5}', "ه"), // heh with yeh above
    ('\u{FBA6}', "ه"), ('\u{FBA7}', "ه"), ('\u{FBA8}', "ه"), ('\u{FBA9}', "ه"), // heh goal
    ('\u{FBAA}', "ه"), ('\u{FBAB}', "ه"), ('\u{FBAC}', "ه"), ('\u{FBAD}', "ه"), // heh doachashmee
    ('\u{FBFC}', "ی"), ('\u{FBFD}', "ی"), ('\u{FBFE}', "ی"), ('\u{FBFF}', "ی"), // farsi yeh

    // Arabic Presentation Forms-B: positional letters
    ('\u{FE80}', "ء"), // hamza
    ('\u{FE81}', "آ"), ('\u{FE82}', "آ"), // alef with madda
    ('\u{FE83}', "ا"), ('\u{FE84}', "ا"), // alef with hamza above
    ('\u{FE85}', "و"), ('\u{FE86}', "و"), // waw with hamza
    ('\u{FE87}', "ا"), ('\u{FE88}', "ا"), // alef with hamza below
    ('\u{FE89}', "ی"), ('\u{FE8A}', "ی"), ('\u{FE8B}', "ی"), ('\u{FE8C}', "ی"), // yeh with hamza
    ('\u{FE8D}', "ا"), ('\u{FE8E}', "ا"), // alef
    ('\u{FE8F}', "ب"), ('\u{FE90}', "ب"), ('\u{FE91}', "ب"), ('\u{FE92}', "ب"), // beh
    ('\u{FE93}', "ه"), ('\u{FE94}', "ه"), // teh marbuta
    ('\u{FE95}', "ت"), ('\u{FE96}', "ت"), ('\u{FE97}', "ت"), ('\u{FE98}', "ت"), // teh
    ('\u{FE99}', "ث"), ('\u{FE9A}', "ث"), ('\u{FE9B}', "ث"), ('\u{FE9C}', "ث"), // theh
    ('\u{FE9D}', "ج"), ('\u{FE9E}', "ج"), ('\u{FE9F}', "ج"), ('\u{FEA0}', "ج"), // jeem
    ('\u{FEA1}', "ح"), ('\u{FEA2}', "ح"), ('\u{FEA3}', "ح"), ('\u{FEA4}', "ح"), // hah
    ('\u{FEA5}', "خ"), ('\u{FEA6}', "خ"), ('\u{FEA7}', "خ"), ('\u{FEA8}', "خ"), // khah
    ('\u{FEA9}', "د"), ('\u{FEAA}', "د"), // dal
    ('\u{FEAB}', "ذ"), ('\u{FEAC}', "ذ"), // thal
    ('\u{FEAD}', "ر"), ('\u{FEAE}', "ر"), // reh
    ('\u{FEAF}', "ز"), ('\u{FEB0}', "ز"), // zain
    ('\u{FEB1}', "س"), ('\u{FEB2}', "س"), ('\u{FEB3}', "س"), ('\u{FEB4}', "س"), // seen
    ('\u{FEB5}', "ش"), ('\u{FEB6}', "ش"), ('\u{FEB7}', "ش"), ('\u{FEB8}', "ش"), // sheen
    ('\u{FEB9}', "ص"), ('\u{FEBA}', "ص"), ('\u{FEBB}', "ص"), ('\u{FEBC}', "ص"), // sad
    ('\u{FEBD}', "ض"), ('\u{FEBE}', "ض"), ('\u{FEBF}', "ض"), ('\u{FEC0}', "ض"), // dad
    ('\u{FEC1}', "ط"), ('\u{FEC2}', "ط"), ('\u{FEC3}', "ط"), ('\u{FEC4}', "ط"), // tah
    ('\u{FEC5}', "ظ"), ('\u{FEC6}', "ظ"), ('\u{FEC7}', "ظ"), ('\u{FEC8}', "ظ"), // zah
    ('\u{FEC9}', "ع"), ('\u{FECA}', "ع"), ('\u{FECB}', "ع"), ('\u{FECC}', "ع"), // ain
    ('\u{FECD}', "غ"), ('\u{FECE}', "غ"), ('\u{FECF}', "غ"), ('\u{FED0}', "غ"), // ghain
    ('\u{FED1}', "ف"), ('\u{FED2}', "ف"), ('\u{FED3}', "ف"), ('\u{FED4}', "ف"), // feh
    ('\u{FED5}', "ق"), ('\u{FED6}', "ق"), ('\u{FED7}', "ق"), ('\u{FED8}', "ق"), // qaf
    ('\u{FED9}', "ک"), ('\u{FEDA}', "ک"), ('\u{FEDB}', "ک"), ('\u{FEDC}', "ک"), // kaf
    ('\u{FEDD}', "ل"), ('\u{FEDE}', "ل"), ('\u{FEDF}', "ل"), ('\u{FEE0}', "ل"), // lam
    ('\u{FEE1}', "م"), ('\u{FEE2}', "م"), ('\u{FEE3}', "م"), ('\u{FEE4}', "م"), // meem
    ('\u{FEE5}', "ن"), ('\u{FEE6}', "ن"), ('\u{FEE7}', "ن"), ('\u{FEE8}', "ن"), // noon
    ('\u{FEE9}', "ه"), ('\u{FEEA}', "ه"), ('\u{FEEB}', "ه"), ('\u{FEEC}', "ه"), // heh
    ('\u{FEED}', "و"), ('\u{FEEE}', "و"), // waw
    ('\u{FEEF}', "ی"), ('\u{FEF0}', "ی"), // alef maksura
    ('\u{FEF1}', "ی"), ('\u{FEF2}', "ی"), ('\u{FEF3}', "ی"), ('\u{FEF4}', "ی"), // yeh

    // Lam-Alef ligatures expand to two letters
    ('\u{FEF5}', "لآ"), ('\u{FEF6}', "لآ"), // lam with alef madda
    ('\u{FEF7}', "لا"), ('\u{FEF8}', "لا"), ('\u{FEF9}', "لا"), ('\u{FEFA}', "لا"), ('\u{FEFB}', "لا"), ('\u{FEFC}', "لا"), // lam with alef, alef hamza

    // Cyrillic and Latin look-alikes
    ('\u{0430}', "a"), ('\u{0435}', "e"), ('\u{043E}', "o"), ('\u{0440}', "p"), ('\u{0441}', "c"), ('\u{0443}', "y"),
    ('\u{0445}', "x"), ('\u{0455}', "s"), ('\u{0456}', "i"), ('\u{0458}', "j"), ('\u{0410}', "A"), ('\u{0412}', "B"),
    ('\u{0415}', "E"), ('\u{041A}', "K"), ('\u{041C}', "M"), ('\u{041D}', "H"), ('\u{041E}', "O"), ('\u{0420}', "P"),
    ('\u{0421}', "C"), ('\u{0422}', "T"), ('\u{0425}', "X"), ('\u{0406}', "I"), ('\u{0131}', "i"), ('\u{0261}', "g"),

    // Persian and Arabic-Indic digits
    ('\u{06F0}', "0"), ('\u{06F1}', "1"), ('\u{06F2}', "2"), ('\u{06F3}', "3"), ('\u{06F4}', "4"),
    ('\u{06F5}', "5"), ('\u{06F6}', "6"), ('\u{06F7}', "7"), ('\u{06F8}', "8"), ('\u{06F9}', "9"),
    ('\u{0660}', "0"), ('\u{0661}', "1"), ('\u{0662}', "2"), ('\u{0663}', "3"), ('\u{0664}', "4"),
    ('\u{0665}', "5"), ('\u{0666}', "6"), ('\u{0667}', "7"), ('\u{0668}', "8"), ('\u{0669}', "9"),

    // Diacritics and tatwil
    ('\u{064B}', ""), ('\u{064C}', ""), ('\u{064D}', ""), ('\u{064E}', ""), ('\u{064F}', ""), ('\u{0650}', ""), ('\u{0651}', ""), ('\u{0652}', ""), // tanween, fatha, damma, kasra, shadda, sukun
    ('\u{0653}', ""), ('\u{0654}', ""), ('\u{0655}', ""), ('\u{0656}', ""), ('\u{0670}', ""), // maddah, hamza marks, superscript alef
    ('\u{0640}', ""), // tatwil
    ('\u{FE70}', ""), ('\u{FE71}', ""), ('\u{FE72}', ""), ('\u{FE73}', ""), ('\u{FE74}', ""), ('\u{FE76}', ""), ('\u{FE77}', ""),
    ('\u{FE78}', ""), ('\u{FE79}', ""), ('\u{FE7A}', ""), ('\u{FE7B}', ""), ('\u{FE7C}', ""), ('\u{FE7D}', ""), ('\u{FE7E}', ""), ('\u{FE7F}', ""), // presentation-form marks

    // Invisible characters and line breaks
    ('\u{200C}', " "), // zero-width non-joiner
    ('\u{200B}', ""), ('\u{200D}', ""), ('\u{2060}', ""), // zero-width space, joiner, word joiner
    ('\u{200E}', ""), ('\u{200F}', ""), // directional marks
    ('\u{FEFF}', ""), // zero-width no-break space / byte order mark
    ('\n', ""), ('\r', ""),

    // Punctuation
    (',', "."), ('\u{066B}', "."), // comma and arabic decimal separator as decimal point
    ('&', " and "),
];

/// Immutable lookup built from a mapping table.
///
/// Build one per process and share it by reference; the table never changes after
/// construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: HashMap<char, &'static str>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer over the built-in [`MAPPINGS`].
    pub fn new() -> Self {
        Self::from_table(MAPPINGS)
    }

    /// Normalizer over an arbitrary table. Later entries win on duplicate keys.
    pub fn from_table(mappings: &'static [(char, &'static str)]) -> Self {
        Self {
            table: mappings.iter().copied().collect(),
        }
    }

    /// Rewrite `text` into canonical form.
    ///
    /// Total: there is no failing input. Characters at either edge that would map to blank
    /// text (a trailing zero-width non-joiner, say) are dropped rather than turned into edge
    /// spaces; every other character outside the table is copied through, whitespace included.
    pub fn normalize(&self, text: &str) -> String {
        let text = text.trim_matches(|c: char| self.maps_to_blank(c));
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match self.table.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }

    fn maps_to_blank(&self, c: char) -> bool {
        self.table
            .get(&c)
            .is_some_and(|replacement| replacement.trim().is_empty())
    }

    /// Whether `c` would be rewritten by this normalizer.
    pub fn is_mapped(&self, c: char) -> bool {
        self.table.contains_key(&c)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Whether `c` belongs to [`PERSIAN_ALPHABET`].
pub fn is_persian_letter(c: char) -> bool {
    PERSIAN_ALPHABET.contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(s: &str) -> String {
        Normalizer::new().normalize(s)
    }

    #[test]
    fn unifies_persian_and_arabic_digits() {
        assert_eq!(normalize("۱۲۳"), "123");
        assert_eq!(normalize("١٢٣"), "123");
        assert_eq!(normalize("فشار ۱۲۰ روی ٨٠"), "فشار 120 روی 80");
    }

    #[test]
    fn expands_lam_alef_ligature() {
        assert_eq!(normalize("ﻻ"), "لا");
        assert_eq!(normalize("ﻵ"), "لآ");
    }

    #[test]
    fn strips_tashkeel_and_tatwil() {
        assert_eq!(normalize("سَّلام"), "سلام");
        assert_eq!(normalize("دكتـــر"), "دکتر");
    }

    #[test]
    fn removes_zero_width_marks() {
        assert_eq!(normalize("سلام\u{200c}"), "سلام");
        assert_eq!(normalize("\u{feff}سلام\u{200d}"), "سلام");
        assert_eq!(normalize("می\u{200c}خواهم"), "می خواهم");
        assert_eq!(normalize("\u{200c}\u{200b}سلام\u{200c}\r\n"), "سلام");
    }

    #[test]
    fn keeps_unmapped_whitespace_at_the_edges() {
        assert_eq!(normalize("\tسلام "), "\tسلام ");
        assert_eq!(normalize(" سلام\u{200c}"), " سلام");
        assert_eq!(normalize("& x"), " and  x");
    }

    #[test]
    fn unifies_arabic_letter_forms() {
        assert_eq!(normalize("كيف"), "کیف");
        assert_eq!(normalize("مدرسة"), "مدرسه");
        assert_eq!(normalize("أحمد"), "احمد");
    }

    #[test]
    fn folds_presentation_forms_to_base_letters() {
        // "ﺳﻼﻡ" written with positional glyphs
        assert_eq!(normalize("\u{FEB3}\u{FEFC}\u{FEE1}"), "سلام");
        assert_eq!(normalize("\u{FB58}\u{FEDF}\u{FEEE}"), "پلو");
    }

    #[test]
    fn maps_cyrillic_look_alikes_to_latin() {
        assert_eq!(normalize("\u{0421}\u{0430}t"), "Cat");
    }

    #[test]
    fn rewrites_punctuation_and_line_breaks() {
        assert_eq!(normalize("2,5 mg"), "2.5 mg");
        assert_eq!(normalize("Tom & Jerry"), "Tom  and  Jerry");
        assert_eq!(normalize("سطر\nدوم"), "سطردوم");
    }

    #[test]
    fn passes_unmapped_characters_through() {
        assert_eq!(normalize("héllo ☺ ؟"), "héllo ☺ ؟");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn replacements_never_reintroduce_keys() {
        let normalizer = Normalizer::new();
        for (source, replacement) in MAPPINGS {
            for c in replacement.chars() {
                assert!(
                    !normalizer.is_mapped(c),
                    "replacement for U+{:04X} contains mapped char U+{:04X}",
                    *source as u32,
                    c as u32
                );
                assert!(
                    is_persian_letter(c) || c.is_ascii(),
                    "replacement for U+{:04X} leaves the canonical alphabet",
                    *source as u32
                );
            }
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let normalizer = Normalizer::new();
        let every_key: String = MAPPINGS.iter().map(|(c, _)| *c).collect();
        let samples = [
            every_key.as_str(),
            "  ﻻ سَّلام ۱۲۳ & \u{200c}",
            "دكتر علي: فشار خون ١٢٠/٨٠ است،\r\nلطفا\u{200c}پاسخ دهيد",
            "plain ascii, with commas & ampersands",
        ];
        for sample in samples {
            let once = normalizer.normalize(sample);
            assert_eq!(normalizer.normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn custom_table_overrides_builtin() {
        static TABLE: &[(char, &str)] = &[('x', "y")];
        let normalizer = Normalizer::from_table(TABLE);
        assert_eq!(normalizer.len(), 1);
        assert_eq!(normalizer.normalize("xzx"), "yzy");
        assert_eq!(normalizer.normalize("۱"), "۱");
    }
}
