use encoding_rs::Encoding;

/// Codec used when the header byte is unrecognized or the label cannot be
/// resolved.
pub const DEFAULT_ENCODING: &str = "WINDOWS-1252";

/// Maps the header's encoding byte to a canonical codec label.
#[must_use]
pub const fn encoding_name(code: u8) -> &'static str {
    match code {
        20 => "UTF-8",
        28 => "US-ASCII",
        29 => "ISO-8859-1",
        30 => "ISO-8859-2",
        31 => "ISO-8859-3",
        32 => "ISO-8859-4",
        33 => "ISO-8859-5",
        34 => "ISO-8859-6",
        35 => "ISO-8859-7",
        36 => "ISO-8859-8",
        37 => "ISO-8859-9",
        39 => "ISO-8859-11",
        40 => "ISO-8859-15",
        41 => "CP437",
        42 => "CP850",
        43 => "CP852",
        44 => "CP857",
        45 => "CP858",
        46 => "CP862",
        47 => "CP864",
        48 => "CP865",
        49 => "CP866",
        50 => "CP869",
        51 => "CP874",
        52 => "CP921",
        53 => "CP922",
        54 => "CP1129",
        55 => "CP720",
        56 => "CP737",
        57 => "CP775",
        58 => "CP860",
        59 => "CP863",
        60 => "WINDOWS-1250",
        61 => "WINDOWS-1251",
        62 => "WINDOWS-1252",
        63 => "WINDOWS-1253",
        64 => "WINDOWS-1254",
        65 => "WINDOWS-1255",
        66 => "WINDOWS-1256",
        67 => "WINDOWS-1257",
        68 => "WINDOWS-1258",
        118 => "CP950",
        119 => "EUC-TW",
        123 => "BIG5",
        125 => "GB18030",
        126 => "CP936",
        128 => "CP1381",
        134 => "EUC-JP",
        136 => "CP949",
        137 => "CP932",
        138 => "SHIFT_JIS",
        140 => "EUC-KR",
        167 => "ISO-2022-JP",
        168 => "ISO-2022-KR",
        169 => "ISO-2022-CN",
        172 => "ISO-2022-CN-EXT",
        _ => DEFAULT_ENCODING,
    }
}

/// Resolves a codec label to an actual codec.
///
/// Unresolvable labels fall back to WINDOWS-1252.
#[must_use]
pub fn resolve_codec(label: &str) -> &'static Encoding {
    resolve_label(label).unwrap_or(encoding_rs::WINDOWS_1252)
}

fn resolve_label(name: &str) -> Option<&'static Encoding> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }

    try_encoding_label(trimmed).or_else(|| {
        let lower = trimmed.to_ascii_lowercase();
        try_encoding_label(&lower)
            .or_else(|| try_encoding_label(&lower.replace('_', "-")))
            .or_else(|| codepage_compat_encoding(&lower))
    })
}

fn try_encoding_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
}

fn codepage_compat_encoding(lower_label: &str) -> Option<&'static Encoding> {
    match lower_label {
        "cp932" => Encoding::for_label(b"shift_jis"),
        "cp936" => Encoding::for_label(b"gbk"),
        "cp949" => Encoding::for_label(b"euc-kr"),
        "cp950" => Encoding::for_label(b"big5"),
        "cp874" => Encoding::for_label(b"windows-874"),
        _ => None,
    }
}

/// Trims trailing `0x00`/`0x20` bytes, then leading `0x20` bytes.
#[must_use]
pub fn trim_field(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != 0 && *b != b' ')
        .map_or(0, |idx| idx + 1);
    let bytes = &bytes[..end];
    let start = bytes
        .iter()
        .position(|b| *b != b' ')
        .unwrap_or(bytes.len());
    &bytes[start..]
}
