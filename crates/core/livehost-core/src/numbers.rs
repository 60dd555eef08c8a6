//! Indonesian number-to-words rendering for prices
//!
//! Spoken replies spell prices out ("seratus lima puluh ribu rupiah", never
//! "150.000") so the speech synthesizer reads them naturally.

/// Render a rupiah price as spoken Indonesian. Zero renders as "gratis".
pub fn price_to_words(price: u64) -> String {
    if price == 0 {
        return "gratis".to_string();
    }

    if price >= 1_000_000 {
        let juta = price / 1_000_000;
        let sisa = price % 1_000_000;
        if sisa == 0 {
            return format!("{} juta rupiah", number_word(juta));
        }
        return format!("{} juta {}", number_word(juta), price_to_words(sisa));
    }

    if price >= 1_000 {
        let ribu = price / 1_000;
        let sisa = price % 1_000;
        let prefix = if ribu == 1 {
            "seribu".to_string()
        } else {
            format!("{} ribu", number_word(ribu))
        };
        if sisa == 0 {
            return format!("{} rupiah", prefix);
        }
        return format!("{} {} rupiah", prefix, number_word(sisa));
    }

    format!("{} rupiah", number_word(price))
}

/// Spell out a number in Indonesian, up to the hundreds of thousands the
/// price renderer feeds it. "seratus" and "sebelas"-style irregulars are
/// handled; larger magnitudes are grouped by the caller.
pub fn number_word(n: u64) -> String {
    const UNITS: [&str; 12] = [
        "nol", "satu", "dua", "tiga", "empat", "lima", "enam", "tujuh", "delapan", "sembilan",
        "sepuluh", "sebelas",
    ];

    match n {
        0..=11 => UNITS[n as usize].to_string(),
        12..=19 => format!("{} belas", UNITS[(n - 10) as usize]),
        20..=99 => {
            let puluhan = n / 10;
            let satuan = n % 10;
            if satuan == 0 {
                format!("{} puluh", UNITS[puluhan as usize])
            } else {
                format!("{} puluh {}", UNITS[puluhan as usize], UNITS[satuan as usize])
            }
        }
        100..=999 => {
            let ratusan = n / 100;
            let sisa = n % 100;
            let prefix = if ratusan == 1 {
                "seratus".to_string()
            } else {
                format!("{} ratus", UNITS[ratusan as usize])
            };
            if sisa == 0 {
                prefix
            } else {
                format!("{} {}", prefix, number_word(sisa))
            }
        }
        _ => {
            let ribuan = n / 1_000;
            let sisa = n % 1_000;
            let prefix = if ribuan == 1 {
                "seribu".to_string()
            } else {
                format!("{} ribu", number_word(ribuan))
            };
            if sisa == 0 {
                prefix
            } else {
                format!("{} {}", prefix, number_word(sisa))
            }
        }
    }
}
