//! Numeric-to-words rendering for written amounts.
//!
//! Pure helper used by plan generation and document contexts. Renders
//! non-negative amounts up to the trillions; the fractional part is
//! rendered as cents over one hundred.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 4] = [
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

fn words_below_thousand(n: u64, out: &mut Vec<String>) {
    let n = n % 1000;
    if n >= 100 {
        out.push(ONES[(n / 100) as usize].to_string());
        out.push("hundred".to_string());
    }
    let rest = n % 100;
    if rest == 0 {
        return;
    }
    if rest < 20 {
        out.push(ONES[rest as usize].to_string());
    } else {
        let tens = TENS[(rest / 10) as usize];
        let ones = rest % 10;
        if ones == 0 {
            out.push(tens.to_string());
        } else {
            out.push(format!("{}-{}", tens, ONES[ones as usize]));
        }
    }
}

/// Render a non-negative integer as English words.
pub fn integer_to_words(mut n: u64) -> String {
    if n == 0 {
        return "zero".to_string();
    }
    let mut parts = Vec::new();
    for (scale, name) in SCALES {
        if n >= scale {
            words_below_thousand(n / scale, &mut parts);
            parts.push(name.to_string());
            n %= scale;
        }
    }
    words_below_thousand(n, &mut parts);
    parts.join(" ")
}

/// Render a monetary amount as a written phrase, e.g.
/// `one million two hundred thousand pounds and 50/100`.
///
/// Negative amounts are prefixed with "minus". Amounts beyond the u64
/// integer range fall back to the plain decimal rendering.
pub fn amount_in_words(amount: Decimal, currency: &str) -> String {
    let negative = amount.is_sign_negative();
    let abs = amount.abs().round_dp(2);

    let Some(whole) = abs.trunc().to_u64() else {
        return format!("{amount} {currency}");
    };
    let cents = ((abs - abs.trunc()) * Decimal::from(100))
        .round()
        .to_u64()
        .unwrap_or(0);

    let mut phrase = format!("{} {}", integer_to_words(whole), currency);
    if cents > 0 {
        phrase.push_str(&format!(" and {cents:02}/100"));
    }
    if negative {
        phrase = format!("minus {phrase}");
    }
    phrase
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_small_numbers() {
        assert_eq!(integer_to_words(0), "zero");
        assert_eq!(integer_to_words(7), "seven");
        assert_eq!(integer_to_words(15), "fifteen");
        assert_eq!(integer_to_words(42), "forty-two");
        assert_eq!(integer_to_words(90), "ninety");
    }

    #[test]
    fn test_hundreds_and_scales() {
        assert_eq!(integer_to_words(305), "three hundred five");
        assert_eq!(integer_to_words(1_000), "one thousand");
        assert_eq!(
            integer_to_words(1_200_000),
            "one million two hundred thousand"
        );
        assert_eq!(
            integer_to_words(50_000_000_000),
            "fifty billion"
        );
    }

    #[test]
    fn test_amount_with_cents() {
        assert_eq!(
            amount_in_words(dec!(200000.50), "pounds"),
            "two hundred thousand pounds and 50/100"
        );
        assert_eq!(amount_in_words(dec!(1), "pounds"), "one pounds");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(amount_in_words(dec!(-3), "pounds"), "minus three pounds");
    }
}
