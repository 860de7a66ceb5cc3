//! Share counts in words, Indian numbering (crore / lakh / thousand / hundred)

const ONES: [&str; 20] = [
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Longest input the crore/lakh grouping can express
pub const MAX_DIGITS: usize = 9;

fn below_hundred(n: u64) -> String {
    let n = n as usize;
    if n < 20 {
        ONES[n].to_string()
    } else if n % 10 == 0 {
        TENS[n / 10].to_string()
    } else {
        format!("{} {}", TENS[n / 10], ONES[n % 10])
    }
}

/// Spell out a whole number given as decimal digits.
///
/// Returns `None` for anything that is not 1..=9 ASCII digits.
///
/// ```
/// use rta_cases::case_documents::number_in_words;
///
/// assert_eq!(number_in_words("100").as_deref(), Some("one hundred only"));
/// assert_eq!(number_in_words("1234567890"), None);
/// ```
pub fn number_in_words(input: &str) -> Option<String> {
    let digits = input.trim();
    if digits.is_empty() || digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let n: u64 = digits.parse().ok()?;
    if n == 0 {
        return Some("zero only".to_string());
    }

    let groups = [
        (n / 10_000_000, "crore"),
        ((n / 100_000) % 100, "lakh"),
        ((n / 1_000) % 100, "thousand"),
        ((n / 100) % 10, "hundred"),
    ];

    let mut words: Vec<String> = groups
        .iter()
        .filter(|(value, _)| *value != 0)
        .map(|(value, unit)| format!("{} {}", below_hundred(*value), unit))
        .collect();

    let rest = n % 100;
    if rest != 0 {
        if !words.is_empty() {
            words.push("and".to_string());
        }
        words.push(below_hundred(rest));
    }

    words.push("only".to_string());
    Some(words.join(" "))
}
