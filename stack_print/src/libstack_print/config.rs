use super::arch::{Host, Platform};
use super::error::StackPrintError;
use super::types::VirtualAddress;
use super::walker::Hardening;

pub const USAGE: &str = "\
Usage: stack_print [--hardened] [--max-frames <n>] [--ceiling <addr>]

Without arguments the frame-pointer chain is walked with the plain
null/ceiling checks only.

  --hardened          also stop on decreasing, misaligned or unreadable frame
                      pointers, reading memory through a safe probe
  --max-frames <n>    stop after n frames (implies --hardened)
  --ceiling <addr>    first address treated as outside user space (hex with 0x or 0X, or decimal)
  -h, --help          print this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    Baseline,
    Hardened(Hardening),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: WalkMode,
    pub ceiling: VirtualAddress,
    pub show_help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: WalkMode::Baseline,
            ceiling: Host::USER_MAX_VA,
            show_help: false,
        }
    }
}

impl Config {
    /// `args` excludes the program name.
    pub fn from_args(args: &[&str]) -> Result<Config, StackPrintError> {
        let mut config = Config::default();
        let mut max_frames: Option<usize> = None;
        let mut hardened = false;
        let mut it = args.iter();
        while let Some(arg) = it.next() {
            match *arg {
                "--hardened" => hardened = true,
                "--max-frames" => {
                    let n = usize::from_integral(expect_value(&mut it, arg)?)?;
                    if n == 0 {
                        return StackPrintError::err("--max-frames must be at least 1");
                    }
                    max_frames = Some(n);
                }
                "--ceiling" => {
                    let addr = u64::from_integral_or_hex(expect_value(&mut it, arg)?)?;
                    config.ceiling = VirtualAddress::new(addr);
                }
                "-h" | "--help" => config.show_help = true,
                other => {
                    return StackPrintError::err(&format!("Unknown argument {other}"));
                }
            }
        }
        if hardened || max_frames.is_some() {
            let mut hardening = Hardening::default();
            if let Some(n) = max_frames {
                hardening.max_frames = n;
            }
            config.mode = WalkMode::Hardened(hardening);
        }
        Ok(config)
    }
}

fn expect_value<'a>(
    it: &mut std::slice::Iter<'_, &'a str>,
    flag: &str,
) -> Result<&'a str, StackPrintError> {
    match it.next() {
        Some(v) => Ok(*v),
        None => StackPrintError::err(&format!("Missing value for {flag}")),
    }
}

pub trait FromLowerHexStr: Sized {
    fn from_integral_lower_hex_radix(s: &str, radix: u32) -> Result<Self, StackPrintError>;

    fn from_integral(s: &str) -> Result<Self, StackPrintError>;

    /// Hex with a `0x`/`0X` prefix, decimal otherwise.
    fn from_integral_or_hex(s: &str) -> Result<Self, StackPrintError> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => Self::from_integral_lower_hex_radix(digits, 16),
            None => Self::from_integral(s),
        }
    }
}

macro_rules! impl_from_lower_hex {
    ($($Ty:ty);+ $(;)?) => {
        $(
            impl FromLowerHexStr for $Ty {
                fn from_integral_lower_hex_radix(text: &str, radix: u32) -> Result<$Ty, StackPrintError>{
                    <$Ty>::from_str_radix(text, radix)
                        .map_err(|_| StackPrintError::new_err(&format!("Invalid number {text}")))
                }

                fn from_integral(text: &str) -> Result<$Ty, StackPrintError>{
                    text.parse::<$Ty>()
                        .map_err(|_| StackPrintError::new_err(&format!("Invalid number {text}")))
                }
            }
        )+
    };
}

impl_from_lower_hex!(u64; usize);
