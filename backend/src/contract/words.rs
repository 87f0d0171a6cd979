//! Spells out currency amounts in Uzbek (Cyrillic script).

const ONES: [&str; 10] = [
    "нол", "бир", "икки", "уч", "тўрт", "беш", "олти", "етти", "саккиз", "тўққиз",
];

const TEENS: [&str; 10] = [
    "ўн",
    "ўн бир",
    "ўн икки",
    "ўн уч",
    "ўн тўрт",
    "ўн беш",
    "ўн олти",
    "ўн етти",
    "ўн саккиз",
    "ўн тўққиз",
];

/// Indexed by the tens digit; 0 and 1 are handled by `ONES`/`TEENS`.
const TENS: [&str; 10] = [
    "", "", "йигирма", "ўттиз", "қирқ", "эллик", "олтмиш", "етмиш", "саксон", "тўқсон",
];

const HUNDREDS: [&str; 10] = [
    "",
    "бир юз",
    "икки юз",
    "уч юз",
    "тўрт юз",
    "беш юз",
    "олти юз",
    "етти юз",
    "саккиз юз",
    "тўққиз юз",
];

/// Scale word per base-1000 group, least significant first.
const SCALES: [&str; 4] = ["", "минг", "миллион", "миллиард"];

const CURRENCY: &str = "сўм";

const MILLIARD: u64 = 1_000_000_000;

/// Converts a whole amount into words followed by the currency name.
///
/// Zero is spelled as the bare word without the currency suffix.
pub fn amount_in_words(amount: u64) -> String {
    if amount == 0 {
        return ONES[0].to_string();
    }
    format!("{} {}", spell(amount), CURRENCY)
}

/// Spells a non-zero number without the currency suffix.
fn spell(number: u64) -> String {
    // Past the largest scale word, the milliard count is spelled recursively.
    if number >= MILLIARD * 1000 {
        let milliards = number / MILLIARD;
        let rest = number % MILLIARD;
        let mut out = format!("{} {}", spell(milliards), SCALES[3]);
        if rest > 0 {
            out.push(' ');
            out.push_str(&spell(rest));
        }
        return out;
    }

    let mut groups = Vec::new();
    let mut remaining = number;
    while remaining > 0 {
        groups.push((remaining % 1000) as usize);
        remaining /= 1000;
    }

    groups
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, group)| **group > 0)
        .map(|(scale, group)| {
            let words = spell_group(*group);
            if SCALES[scale].is_empty() {
                words
            } else {
                format!("{} {}", words, SCALES[scale])
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spells a single group in `1..=999`.
fn spell_group(group: usize) -> String {
    let hundreds = group / 100;
    let rest = group % 100;

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }
    match rest {
        0 => {}
        1..=9 => parts.push(ONES[rest]),
        10..=19 => parts.push(TEENS[rest - 10]),
        _ => {
            parts.push(TENS[rest / 10]);
            if rest % 10 > 0 {
                parts.push(ONES[rest % 10]);
            }
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spells_table_cases() {
        let cases: &[(u64, &str)] = &[
            (0, "нол"),
            (7, "етти сўм"),
            (10, "ўн сўм"),
            (15, "ўн беш сўм"),
            (23, "йигирма уч сўм"),
            (90, "тўқсон сўм"),
            (100, "бир юз сўм"),
            (305, "уч юз беш сўм"),
            (999, "тўққиз юз тўқсон тўққиз сўм"),
            (1000, "бир минг сўм"),
            (2019, "икки минг ўн тўққиз сўм"),
            (1_000_000, "бир миллион сўм"),
            (1_250_000, "бир миллион икки юз эллик минг сўм"),
            (3_000_000_047, "уч миллиард қирқ етти сўм"),
        ];
        for (amount, expected) in cases {
            assert_eq!(amount_in_words(*amount), *expected, "amount {amount}");
        }
    }

    #[test]
    fn zero_has_no_currency_suffix() {
        assert!(!amount_in_words(0).contains(CURRENCY));
        assert!(amount_in_words(1).ends_with(CURRENCY));
    }

    #[test]
    fn amounts_past_milliards_count_milliards() {
        assert_eq!(amount_in_words(1_000_000_000_000), "бир минг миллиард сўм");
        assert_eq!(
            amount_in_words(2_000_000_000_005),
            "икки минг миллиард беш сўм"
        );
    }
}
