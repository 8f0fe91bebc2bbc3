use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{bail, Context};
use fetch_bench_core::prelude::{ClientReuse, Strategy};
use serde::Deserialize;

/// A named combination of a [Strategy] and a [ClientReuse] mode that can be picked from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Variant {
    Sequential,
    ConcurrentReusedClient,
    /// A new client for every request. Expect memory and handle counts to grow with the number of
    /// requests.
    ConcurrentPerRequestClient,
    BoundedParallelWebRequest,
    BoundedParallelHttpClient,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Sequential,
        Variant::ConcurrentReusedClient,
        Variant::ConcurrentPerRequestClient,
        Variant::BoundedParallelWebRequest,
        Variant::BoundedParallelHttpClient,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Sequential => "sequential",
            Variant::ConcurrentReusedClient => "concurrent-reused-client",
            Variant::ConcurrentPerRequestClient => "concurrent-per-request-client",
            Variant::BoundedParallelWebRequest => "bounded-parallel-webrequest",
            Variant::BoundedParallelHttpClient => "bounded-parallel-httpclient",
        }
    }

    /// The single letter used to pick this variant from the menu, for the variants that have one.
    pub fn shortcut(&self) -> Option<char> {
        match self {
            Variant::Sequential => Some('s'),
            Variant::ConcurrentPerRequestClient => Some('a'),
            Variant::BoundedParallelWebRequest => Some('p'),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variant::Sequential => "one request at a time",
            Variant::ConcurrentReusedClient => "all requests at once, one shared client",
            Variant::ConcurrentPerRequestClient => {
                "all requests at once, a client per request (memory leak scenario)"
            }
            Variant::BoundedParallelWebRequest => {
                "worker pool sized to the CPU count, a client per request"
            }
            Variant::BoundedParallelHttpClient => {
                "worker pool sized to the CPU count, one shared client"
            }
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Variant::Sequential => Strategy::Sequential,
            Variant::ConcurrentReusedClient | Variant::ConcurrentPerRequestClient => {
                Strategy::Concurrent
            }
            Variant::BoundedParallelWebRequest | Variant::BoundedParallelHttpClient => {
                Strategy::BoundedParallel
            }
        }
    }

    pub fn client_reuse(&self) -> ClientReuse {
        match self {
            Variant::ConcurrentReusedClient | Variant::BoundedParallelHttpClient => {
                ClientReuse::Shared
            }
            Variant::Sequential
            | Variant::ConcurrentPerRequestClient
            | Variant::BoundedParallelWebRequest => ClientReuse::PerRequest,
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    /// Accepts the variant name, its menu number or its shortcut letter, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();

        Variant::ALL
            .iter()
            .enumerate()
            .find(|(position, variant)| {
                variant.name() == s
                    || (position + 1).to_string() == s
                    || variant.shortcut().map(String::from).as_deref() == Some(s.as_str())
            })
            .map(|(_, variant)| *variant)
            .ok_or_else(|| {
                format!(
                    "Unknown variant '{s}', expected one of: {}",
                    Variant::ALL.map(|v| v.name()).join(", ")
                )
            })
    }
}

impl TryFrom<String> for Variant {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Show the variant menu and read a choice, asking again until the input names a variant.
pub fn prompt_variant<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> anyhow::Result<Variant> {
    loop {
        writeln!(output, "Choose the test type")?;
        for (position, variant) in Variant::ALL.iter().enumerate() {
            let shortcut = variant
                .shortcut()
                .map(|c| format!(" ({c})"))
                .unwrap_or_default();
            writeln!(
                output,
                " {} = {}{} - {}",
                position + 1,
                variant.name(),
                shortcut,
                variant.description()
            )?;
        }
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read the variant choice")?;
        if read == 0 {
            bail!("Input closed before a variant was chosen");
        }

        match line.parse::<Variant>() {
            Ok(variant) => return Ok(variant),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_names() {
        for variant in Variant::ALL {
            assert_eq!(Ok(variant), variant.name().parse());
            assert_eq!(Ok(variant), variant.name().to_uppercase().parse());
        }
    }

    #[test]
    fn parse_shortcuts_and_numbers() {
        assert_eq!(Ok(Variant::Sequential), "s".parse());
        assert_eq!(Ok(Variant::ConcurrentPerRequestClient), "a".parse());
        assert_eq!(Ok(Variant::BoundedParallelWebRequest), " p\n".parse());
        assert_eq!(Ok(Variant::ConcurrentReusedClient), "2".parse());
        assert_eq!(Ok(Variant::BoundedParallelHttpClient), "5".parse());
    }

    #[test]
    fn reject_unknown() {
        assert!("x".parse::<Variant>().is_err());
        assert!("0".parse::<Variant>().is_err());
        assert!("".parse::<Variant>().is_err());
    }

    #[test]
    fn variants_map_to_strategy_and_client_reuse() {
        let expected = [
            (Strategy::Sequential, ClientReuse::PerRequest),
            (Strategy::Concurrent, ClientReuse::Shared),
            (Strategy::Concurrent, ClientReuse::PerRequest),
            (Strategy::BoundedParallel, ClientReuse::PerRequest),
            (Strategy::BoundedParallel, ClientReuse::Shared),
        ];

        let actual = Variant::ALL.map(|v| (v.strategy(), v.client_reuse()));
        assert_eq!(expected, actual);
    }

    #[test]
    fn prompt_asks_again_after_invalid_input() {
        let mut input = "q\n\nconcurrent-reused-client\n".as_bytes();
        let mut output = Vec::new();

        let variant = prompt_variant(&mut input, &mut output).unwrap();
        assert_eq!(Variant::ConcurrentReusedClient, variant);

        let output = String::from_utf8(output).unwrap();
        assert_eq!(3, output.matches("Choose the test type").count());
        assert_eq!(2, output.matches("Unknown variant").count());
        assert!(output.contains(" 3 = concurrent-per-request-client (a) - "));
    }

    #[test]
    fn prompt_fails_when_input_closes() {
        let mut input = "nope\n".as_bytes();
        let mut output = Vec::new();

        assert!(prompt_variant(&mut input, &mut output).is_err());
    }
}
