//! Kana and romaji conversion tables

use ahash::AHashMap;
use lazy_static::lazy_static;

/// Distance between a hiragana code point and its katakana counterpart
const KATAKANA_OFFSET: u32 = 0x60;

const ROMAJI_TABLE: &[(&str, &str)] = &[
    ("ァ", "a"), ("ア", "A"), ("ィ", "i"), ("イ", "I"), ("ゥ", "u"), ("ウ", "U"),
    ("ェ", "e"), ("エ", "E"), ("ォ", "o"), ("オ", "O"), ("カ", "KA"), ("ガ", "GA"),
    ("キ", "KI"), ("ギ", "GI"), ("ク", "KU"), ("グ", "GU"), ("ケ", "KE"), ("ゲ", "GE"),
    ("コ", "KO"), ("ゴ", "GO"), ("サ", "SA"), ("ザ", "ZA"), ("シ", "SI"), ("ジ", "ZI"),
    ("ス", "SU"), ("ズ", "ZU"), ("セ", "SE"), ("ゼ", "ZE"), ("ソ", "SO"), ("ゾ", "ZO"),
    ("タ", "TA"), ("ダ", "DA"), ("チ", "TI"), ("ヂ", "DI"), ("ッ", "tu"), ("ツ", "TU"),
    ("ヅ", "DU"), ("テ", "TE"), ("デ", "DE"), ("ト", "TO"), ("ド", "DO"), ("ナ", "NA"),
    ("ニ", "NI"), ("ヌ", "NU"), ("ネ", "NE"), ("ノ", "NO"), ("ハ", "HA"), ("バ", "BA"),
    ("パ", "PA"), ("ヒ", "HI"), ("ビ", "BI"), ("ピ", "PI"), ("フ", "HU"), ("ブ", "BU"),
    ("プ", "PU"), ("ヘ", "HE"), ("ベ", "BE"), ("ペ", "PE"), ("ホ", "HO"), ("ボ", "BO"),
    ("ポ", "PO"), ("マ", "MA"), ("ミ", "MI"), ("ム", "MU"), ("メ", "ME"), ("モ", "MO"),
    ("ャ", "ya"), ("ヤ", "YA"), ("ュ", "yu"), ("ユ", "YU"), ("ョ", "yo"), ("ヨ", "YO"),
    ("ラ", "RA"), ("リ", "RI"), ("ル", "RU"), ("レ", "RE"), ("ロ", "RO"), ("ヮ", "wa"),
    ("ワ", "WA"), ("ヲ", "WO"), ("ン", "n"), ("ヴァ", "VA"), ("ヴィ", "VI"), ("ヴ", "VU"),
    ("ヴェ", "VE"), ("ヴォ", "VO"), ("ヵ", "ka"), ("ヶ", "ke"), ("ー", "-"), ("キャ", "Kya"),
    ("ギャ", "Gya"), ("キュ", "Kyu"), ("ギュ", "Gyu"), ("キョ", "Kyo"), ("ギョ", "Gyo"), ("シャ", "Sya"),
    ("ジャ", "Zya"), ("シュ", "Syu"), ("ジュ", "Zyu"), ("ショ", "Syo"), ("ジョ", "Zyo"), ("チャ", "Tya"),
    ("ヂャ", "Dya"), ("チュ", "Tyu"), ("ヂュ", "Dyu"), ("チョ", "Tyo"), ("ヂョ", "Dyo"), ("ニャ", "Nya"),
    ("ニュ", "Nyu"), ("ニョ", "Nyo"), ("ヒャ", "Hya"), ("ビャ", "Bya"), ("ピャ", "Pya"), ("ヒュ", "Hyu"),
    ("ビュ", "Byu"), ("ピュ", "Pyu"), ("ヒョ", "Hyo"), ("ビョ", "Byo"), ("ピョ", "Pyo"), ("ミャ", "Mya"),
    ("ミュ", "Myu"), ("ミョ", "Myo"), ("リャ", "Rya"), ("リュ", "Ryu"), ("リョ", "Ryo"), ("クヮ", "Kwa"),
    ("グヮ", "Gwa"), ("ウィ", "ui"), ("ウェ", "ue"), ("ウォ", "uo"), ("チェ", "Tie"), ("ティ", "Tei"),
    ("ファ", "Hua"), ("フィ", "Hui"), ("フェ", "Hue"), ("フォ", "Huo"), ("ッカ", "kKA"), ("ッガ", "gGA"),
    ("ッキ", "kKI"), ("ッギ", "gGI"), ("ック", "kKU"), ("ッグ", "gGU"), ("ッケ", "kKE"), ("ッゲ", "gGE"),
    ("ッコ", "kKO"), ("ッゴ", "gGO"), ("ッサ", "sSA"), ("ッザ", "zZA"), ("ッシ", "sSI"), ("ッジ", "zZI"),
    ("ッス", "sSU"), ("ッズ", "zZU"), ("ッセ", "sSE"), ("ッゼ", "zZE"), ("ッソ", "sSO"), ("ッゾ", "zZO"),
    ("ッタ", "tTA"), ("ッダ", "dDA"), ("ッチ", "tTI"), ("ッヂ", "dDI"), ("ッツ", "tTU"), ("ッヅ", "dDU"),
    ("ッテ", "tTE"), ("ッデ", "dDE"), ("ット", "tTO"), ("ッド", "dDO"), ("ッナ", "nNA"), ("ッニ", "nNI"),
    ("ッヌ", "nNU"), ("ッネ", "nNE"), ("ッノ", "nNO"), ("ッハ", "hHA"), ("ッバ", "bBA"), ("ッパ", "pPA"),
    ("ッヒ", "hHI"), ("ッビ", "bBI"), ("ッピ", "pPI"), ("ッフ", "hHU"), ("ッブ", "bBU"), ("ップ", "pPU"),
    ("ッヘ", "hHE"), ("ッベ", "bBE"), ("ッペ", "pPE"), ("ッホ", "hHO"), ("ッボ", "bBO"), ("ッポ", "pPO"),
    ("ッマ", "mMA"), ("ッミ", "mMI"), ("ッム", "mMU"), ("ッメ", "mME"), ("ッモ", "mMO"), ("ッヤ", "yYA"),
    ("ッユ", "yYU"), ("ッヨ", "yYO"), ("ッラ", "rRA"), ("ッリ", "rRI"), ("ッル", "rRU"), ("ッレ", "rRE"),
    ("ッロ", "rRO"), ("ッワ", "wWA"), ("ッヲ", "wWO"), ("ッヴ", "vVU"),
];

lazy_static! {
    static ref ROMAJI: AHashMap<&'static str, &'static str> =
        ROMAJI_TABLE.iter().copied().collect();
}

/// Append the katakana form of `c`, returning false if `c` is not kana
///
/// Hiragana is shifted to katakana and archaic letters are replaced by their
/// modern readings.
pub fn push_katakana(c: char, out: &mut String) -> bool {
    match c {
        'ゐ' | 'ヰ' => out.push('イ'),
        'ゑ' | 'ヱ' => out.push('エ'),
        'ゟ' => out.push_str("ヨリ"),
        'ゝ' => out.push('ヽ'),
        'ゞ' => out.push('ヾ'),
        'ヿ' => out.push_str("コト"),
        'ぁ'..='ゖ' => out.push(char::from_u32(c as u32 + KATAKANA_OFFSET).unwrap_or(c)),
        'ァ'..='ヶ' => out.push(c),
        _ => return false,
    }
    true
}

pub fn is_kana(c: char) -> bool {
    push_katakana(c, &mut String::new())
}

pub fn is_kana_word(word: &str) -> bool {
    word.chars().all(is_kana)
}

/// Katakana reading of `text`; non-kana letters pass through unchanged
pub fn to_katakana(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if !push_katakana(c, &mut out) {
            out.push(c);
        }
    }
    out
}

/// Transliterate a katakana reading into romaji letters
///
/// Long vowels become `-` and a geminate ッ becomes the doubled consonant.
/// Upper case marks the head of a mora; it is folded to lower case unless
/// `keep_case` is set.
pub fn to_romaji(reading: &str, keep_case: bool) -> Vec<char> {
    let letters: Vec<char> = reading.chars().collect();
    let mut out = Vec::with_capacity(letters.len() * 2);
    let mut i = 0;
    while i < letters.len() {
        let mut unit = letters[i].to_string();
        if let Some(&next) = letters.get(i + 1) {
            let pair: String = [letters[i], next].iter().collect();
            if let Some(romaji) = ROMAJI.get(pair.as_str()) {
                if letters[i] == 'ッ' {
                    // next letter may still pair with the one after it
                    if let Some(first) = romaji.chars().next() {
                        unit = first.to_string();
                    }
                } else {
                    unit = pair;
                    i += 1;
                }
            }
        }

        let converted = ROMAJI.get(unit.as_str()).copied().unwrap_or(unit.as_str());
        out.extend(converted.chars().map(|c| {
            if keep_case {
                c
            } else {
                c.to_ascii_lowercase()
            }
        }));
        i += 1;
    }
    out
}
