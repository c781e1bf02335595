// Dice rolling core.
//
// Parses expressions like `2d6+3`, `4d6kh3` or `d%` and rolls them with an
// injected RNG. Nothing in here knows about Discord; the command layer only
// passes a string in and renders the `RollOutcome` it gets back.

use rand::Rng;
use std::fmt;
use thiserror::Error;

pub const MAX_DICE_PER_TERM: u32 = 100;
pub const MAX_TOTAL_DICE: u32 = 200;
pub const MAX_SIDES: u32 = 1000;
pub const MAX_TERMS: usize = 20;
pub const MAX_CONSTANT: i64 = 100_000;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Expression is empty")]
    Empty,

    #[error("Could not understand `{0}`")]
    InvalidTerm(String),

    #[error("A single term can roll at most 100 dice")]
    TooManyDice,

    #[error("An expression can roll at most 200 dice in total")]
    TooManyDiceTotal,

    #[error("Dice must have between 2 and 1000 sides")]
    InvalidSides,

    #[error("Keep count must be between 1 and the number of dice rolled")]
    InvalidKeep,

    #[error("Expressions are limited to 20 terms")]
    TooManyTerms,

    #[error("Constants must be within ±100000")]
    ConstantOutOfRange,

    #[error("Give me at least two options to choose from")]
    NotEnoughChoices,
}

// ============================================================================
// EXPRESSION MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn apply(self, value: i64) -> i64 {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }
}

/// Which dice of a term count towards the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    All,
    Highest(u32),
    Lowest(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Dice { count: u32, sides: u32, keep: Keep },
    Constant(i64),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Dice { count, sides, keep } => {
                write!(f, "{}d{}", count, sides)?;
                match keep {
                    Keep::All => Ok(()),
                    Keep::Highest(k) => write!(f, "kh{}", k),
                    Keep::Lowest(k) => write!(f, "kl{}", k),
                }
            }
            Term::Constant(value) => write!(f, "{}", value),
        }
    }
}

/// A parsed, validated dice expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceExpression {
    terms: Vec<(Sign, Term)>,
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (sign, term)) in self.terms.iter().enumerate() {
            match (i, sign) {
                (0, Sign::Plus) => write!(f, "{}", term)?,
                (0, Sign::Minus) => write!(f, "-{}", term)?,
                _ => write!(f, " {} {}", sign.symbol(), term)?,
            }
        }
        Ok(())
    }
}

/// The result of rolling a single term.
#[derive(Debug, Clone)]
pub struct TermRoll {
    pub sign: Sign,
    pub term: Term,
    pub rolls: Vec<u32>,
    /// Parallel to `rolls`: whether each die counted towards the subtotal.
    pub kept: Vec<bool>,
    pub subtotal: i64,
}

/// Natural result on a lone d20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Natural {
    Twenty,
    One,
}

#[derive(Debug, Clone)]
pub struct RollOutcome {
    pub expression: String,
    pub terms: Vec<TermRoll>,
    pub total: i64,
}

impl RollOutcome {
    /// Only a bare `1d20` (optionally with a flat modifier) can crit.
    pub fn natural(&self) -> Option<Natural> {
        let mut dice_terms = self
            .terms
            .iter()
            .filter(|t| matches!(t.term, Term::Dice { .. }));
        let first = dice_terms.next()?;
        if dice_terms.next().is_some() || first.sign != Sign::Plus {
            return None;
        }

        match (first.term, first.rolls.as_slice()) {
            (Term::Dice { count: 1, sides: 20, .. }, [20]) => Some(Natural::Twenty),
            (Term::Dice { count: 1, sides: 20, .. }, [1]) => Some(Natural::One),
            _ => None,
        }
    }

    /// Human readable breakdown, e.g. `2d6 (3, 5) + 4 = 12`.
    /// Dropped dice are wrapped in `~~` so Discord strikes them through.
    pub fn breakdown(&self) -> String {
        let mut out = String::new();
        for (i, roll) in self.terms.iter().enumerate() {
            if i == 0 {
                if roll.sign == Sign::Minus {
                    out.push('-');
                }
            } else {
                out.push_str(&format!(" {} ", roll.sign.symbol()));
            }

            match roll.term {
                Term::Dice { .. } => {
                    let faces: Vec<String> = roll
                        .rolls
                        .iter()
                        .zip(&roll.kept)
                        .map(|(value, kept)| {
                            if *kept {
                                value.to_string()
                            } else {
                                format!("~~{}~~", value)
                            }
                        })
                        .collect();
                    out.push_str(&format!("{} ({})", roll.term, faces.join(", ")));
                }
                Term::Constant(value) => out.push_str(&value.to_string()),
            }
        }
        out.push_str(&format!(" = {}", self.total));
        out
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse a dice expression. Whitespace is ignored and case doesn't matter.
pub fn parse(input: &str) -> Result<DiceExpression, DiceError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        return Err(DiceError::Empty);
    }

    let mut terms = Vec::new();
    let mut sign = Sign::Plus;
    let mut buffer = String::new();

    for (i, c) in cleaned.char_indices() {
        match c {
            '+' | '-' => {
                if buffer.is_empty() {
                    // Only a leading sign may appear without a term before it.
                    if i != 0 {
                        return Err(DiceError::InvalidTerm(cleaned.clone()));
                    }
                } else {
                    terms.push((sign, parse_term(&buffer)?));
                    buffer.clear();
                }
                sign = if c == '+' { Sign::Plus } else { Sign::Minus };
            }
            _ => buffer.push(c),
        }
    }

    if buffer.is_empty() {
        return Err(DiceError::InvalidTerm(cleaned));
    }
    terms.push((sign, parse_term(&buffer)?));

    if terms.len() > MAX_TERMS {
        return Err(DiceError::TooManyTerms);
    }

    let total_dice: u32 = terms
        .iter()
        .map(|(_, term)| match term {
            Term::Dice { count, .. } => *count,
            Term::Constant(_) => 0,
        })
        .sum();
    if total_dice > MAX_TOTAL_DICE {
        return Err(DiceError::TooManyDiceTotal);
    }

    Ok(DiceExpression { terms })
}

fn parse_term(raw: &str) -> Result<Term, DiceError> {
    let invalid = || DiceError::InvalidTerm(raw.to_string());

    let Some(d_pos) = raw.find('d') else {
        let value: i64 = raw.parse().map_err(|_| invalid())?;
        if value.abs() > MAX_CONSTANT {
            return Err(DiceError::ConstantOutOfRange);
        }
        return Ok(Term::Constant(value));
    };

    let (count_str, rest) = (&raw[..d_pos], &raw[d_pos + 1..]);
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str.parse().map_err(|_| invalid())?
    };

    let (sides_str, keep_suffix) = if let Some(pos) = rest.find("kh") {
        (&rest[..pos], Some((true, &rest[pos + 2..])))
    } else if let Some(pos) = rest.find("kl") {
        (&rest[..pos], Some((false, &rest[pos + 2..])))
    } else {
        (rest, None)
    };

    let sides: u32 = if sides_str == "%" {
        100
    } else {
        sides_str.parse().map_err(|_| invalid())?
    };

    if count == 0 {
        return Err(invalid());
    }
    if count > MAX_DICE_PER_TERM {
        return Err(DiceError::TooManyDice);
    }
    if !(2..=MAX_SIDES).contains(&sides) {
        return Err(DiceError::InvalidSides);
    }

    let keep = match keep_suffix {
        None => Keep::All,
        Some((highest, k_str)) => {
            let k: u32 = k_str.parse().map_err(|_| invalid())?;
            if k == 0 || k > count {
                return Err(DiceError::InvalidKeep);
            }
            if highest {
                Keep::Highest(k)
            } else {
                Keep::Lowest(k)
            }
        }
    };

    Ok(Term::Dice { count, sides, keep })
}

// ============================================================================
// ROLLING
// ============================================================================

impl DiceExpression {
    pub fn roll<R: Rng>(&self, rng: &mut R) -> RollOutcome {
        let mut total = 0i64;
        let mut rolled = Vec::with_capacity(self.terms.len());

        for (sign, term) in &self.terms {
            let roll = match *term {
                Term::Dice { count, sides, keep } => {
                    let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
                    let kept = kept_mask(&rolls, keep);
                    let subtotal: i64 = rolls
                        .iter()
                        .zip(&kept)
                        .filter(|(_, k)| **k)
                        .map(|(v, _)| *v as i64)
                        .sum();
                    TermRoll {
                        sign: *sign,
                        term: *term,
                        rolls,
                        kept,
                        subtotal,
                    }
                }
                Term::Constant(value) => TermRoll {
                    sign: *sign,
                    term: *term,
                    rolls: Vec::new(),
                    kept: Vec::new(),
                    subtotal: value,
                },
            };
            total += sign.apply(roll.subtotal);
            rolled.push(roll);
        }

        RollOutcome {
            expression: self.to_string(),
            terms: rolled,
            total,
        }
    }
}

fn kept_mask(rolls: &[u32], keep: Keep) -> Vec<bool> {
    let (k, highest) = match keep {
        Keep::All => return vec![true; rolls.len()],
        Keep::Highest(k) => (k as usize, true),
        Keep::Lowest(k) => (k as usize, false),
    };

    // Ties resolve towards the earlier die so the output is stable.
    let mut order: Vec<usize> = (0..rolls.len()).collect();
    order.sort_by(|&a, &b| {
        let by_value = if highest {
            rolls[b].cmp(&rolls[a])
        } else {
            rolls[a].cmp(&rolls[b])
        };
        by_value.then(a.cmp(&b))
    });

    let mut mask = vec![false; rolls.len()];
    for &idx in order.iter().take(k) {
        mask[idx] = true;
    }
    mask
}

// ============================================================================
// SMALL RANDOM HELPERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "Heads"),
            CoinSide::Tails => write!(f, "Tails"),
        }
    }
}

pub fn flip_coin<R: Rng>(rng: &mut R) -> CoinSide {
    if rng.gen_bool(0.5) {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Pick one of several options separated by `|` (or `,` when no pipe is present).
pub fn choose<R: Rng>(input: &str, rng: &mut R) -> Result<String, DiceError> {
    let separator = if input.contains('|') { '|' } else { ',' };
    let options: Vec<&str> = input
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if options.len() < 2 {
        return Err(DiceError::NotEnoughChoices);
    }

    let pick = options[rng.gen_range(0..options.len())];
    Ok(pick.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn parses_standard_notation() {
        let expr = parse("2d6 + 3").unwrap();
        assert_eq!(expr.to_string(), "2d6 + 3");

        let expr = parse("d20").unwrap();
        assert_eq!(expr.to_string(), "1d20");

        let expr = parse("D%").unwrap();
        assert_eq!(expr.to_string(), "1d100");

        let expr = parse("-1 + 4d6kh3").unwrap();
        assert_eq!(expr.to_string(), "-1 + 4d6kh3");
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!(parse("   "), Err(DiceError::Empty));
        assert!(matches!(parse("2d6+"), Err(DiceError::InvalidTerm(_))));
        assert!(matches!(parse("2d6++1"), Err(DiceError::InvalidTerm(_))));
        assert!(matches!(parse("0d6"), Err(DiceError::InvalidTerm(_))));
        assert!(matches!(parse("abc"), Err(DiceError::InvalidTerm(_))));
        assert_eq!(parse("1d1"), Err(DiceError::InvalidSides));
        assert_eq!(parse("1d1001"), Err(DiceError::InvalidSides));
        assert_eq!(parse("4d6kh5"), Err(DiceError::InvalidKeep));
        assert_eq!(parse("4d6kl0"), Err(DiceError::InvalidKeep));
        assert_eq!(parse("101d6"), Err(DiceError::TooManyDice));
        assert_eq!(parse("100d6+100d6+1d6"), Err(DiceError::TooManyDiceTotal));
        assert_eq!(parse("100001"), Err(DiceError::ConstantOutOfRange));
    }

    #[test]
    fn term_limit_is_enforced() {
        let many = vec!["1"; MAX_TERMS + 1].join("+");
        assert_eq!(parse(&many), Err(DiceError::TooManyTerms));
    }

    #[test]
    fn totals_stay_within_bounds() {
        let expr = parse("2d6+3").unwrap();
        let mut rng = rng();
        for _ in 0..500 {
            let outcome = expr.roll(&mut rng);
            assert!((5..=15).contains(&outcome.total), "total {}", outcome.total);
        }
    }

    #[test]
    fn constants_only_expression() {
        let outcome = parse("5 - 2").unwrap().roll(&mut rng());
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.breakdown(), "5 - 2 = 3");
    }

    #[test]
    fn keep_highest_keeps_the_right_dice() {
        let expr = parse("4d6kh3").unwrap();
        let mut rng = rng();
        for _ in 0..100 {
            let outcome = expr.roll(&mut rng);
            let term = &outcome.terms[0];
            assert_eq!(term.kept.iter().filter(|k| **k).count(), 3);

            let dropped = term
                .rolls
                .iter()
                .zip(&term.kept)
                .find(|(_, k)| !**k)
                .map(|(v, _)| *v)
                .unwrap();
            assert_eq!(dropped, *term.rolls.iter().min().unwrap());

            let expected: i64 = term.rolls.iter().map(|v| *v as i64).sum::<i64>() - dropped as i64;
            assert_eq!(outcome.total, expected);
        }
    }

    #[test]
    fn keep_lowest_resolves_ties_to_earliest_die() {
        assert_eq!(kept_mask(&[3, 1, 1, 5], Keep::Lowest(1)), vec![false, true, false, false]);
        assert_eq!(kept_mask(&[6, 6, 2], Keep::Highest(1)), vec![true, false, false]);
    }

    #[test]
    fn natural_results_only_for_single_d20() {
        let mut rng = rng();
        let expr = parse("1d20+5").unwrap();
        for _ in 0..200 {
            let outcome = expr.roll(&mut rng);
            match outcome.terms[0].rolls[0] {
                20 => assert_eq!(outcome.natural(), Some(Natural::Twenty)),
                1 => assert_eq!(outcome.natural(), Some(Natural::One)),
                _ => assert_eq!(outcome.natural(), None),
            }
        }

        let outcome = parse("2d20").unwrap().roll(&mut rng);
        assert_eq!(outcome.natural(), None);
    }

    #[test]
    fn breakdown_strikes_dropped_dice() {
        let outcome = RollOutcome {
            expression: "2d20kh1 + 2".to_string(),
            terms: vec![
                TermRoll {
                    sign: Sign::Plus,
                    term: Term::Dice {
                        count: 2,
                        sides: 20,
                        keep: Keep::Highest(1),
                    },
                    rolls: vec![4, 17],
                    kept: vec![false, true],
                    subtotal: 17,
                },
                TermRoll {
                    sign: Sign::Plus,
                    term: Term::Constant(2),
                    rolls: vec![],
                    kept: vec![],
                    subtotal: 2,
                },
            ],
            total: 19,
        };

        assert_eq!(outcome.breakdown(), "2d20kh1 (~~4~~, 17) + 2 = 19");
    }

    #[test]
    fn choose_needs_two_options() {
        let mut rng = rng();
        assert_eq!(choose("pizza", &mut rng), Err(DiceError::NotEnoughChoices));

        let pick = choose("pizza | tacos | sushi", &mut rng).unwrap();
        assert!(["pizza", "tacos", "sushi"].contains(&pick.as_str()));

        let pick = choose("red, blue", &mut rng).unwrap();
        assert!(["red", "blue"].contains(&pick.as_str()));
    }
}
