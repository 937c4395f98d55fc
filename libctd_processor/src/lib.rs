//! # ctd_processor
//!
//! ctd_processor sequences the SBE Data Processing tools (DatCnvW, FilterW, DeriveW,
//! BottleSumW, ...) over a set of raw CTD casts. For every raw .hex file it points each
//! processing step's PSA settings file at the right input, output and instrument-definition
//! (.XMLCON) locations, then runs the selected tools one after another with the command line
//! they expect.
//!
//! ## Installation
//!
//! The only method of install is from source. If you have not used Rust before, see the
//! [Rust docs](https://www.rust-lang.org/tools/install) for installing the tool chain.
//!
//! To build and install the CLI use `cargo install --path ./ctd_processor_cli` from the top
//! level repository. The SBE tools themselves are not part of this project and have to be
//! installed separately.
//!
//! ## Concepts
//!
//! - Raw file: the binary .hex recording of one cast. Its base name (no extension) is shared
//!   by all companion files: `<base>.XMLCON` next to the raw file, `<base>.cnv` and `<base>.ros`
//!   in the output directory.
//! - Processing step: one PSA file from the PSA directory. Each step has an executable, an order
//!   and an enabled flag. Steps run in ascending order; steps with equal order keep the order
//!   they are listed in.
//! - Executable: one of the SBE tools, classified once by its file name:
//!   - names containing `DatCnvW` are the conversion tool; it reads the raw file
//!   - names containing `BottleSumW` are the summary tool; it reads `<base>.ros`
//!   - names containing `DeriveW` are the derivation tool; it reads `<base>.cnv`
//!   - everything else reads `<base>.cnv`
//!
//!   The first three also get the instrument file passed with `/c`.
//!
//! ## Configuration
//!
//! A run configuration is a YAML file:
//!
//! ```yml
//! raw_files:
//! - C:/cruise/raw/cast01.hex
//! config_dir: C:/cruise/psa
//! executables_dir: C:/Program Files (x86)/Sea-Bird/SBEDataProcessing-Win32
//! output_dir: C:/cruise/processed
//! executables:
//! - C:/Program Files (x86)/Sea-Bird/SBEDataProcessing-Win32/DatCnvW.exe
//! steps:
//! - config_file: DatCnvW.psa
//!   executable: C:/Program Files (x86)/Sea-Bird/SBEDataProcessing-Win32/DatCnvW.exe
//!   order: 1
//!   enabled: true
//! ```
//!
//! The order of a step may be written as text; it only has to be a valid integer when a run
//! starts, otherwise the whole run is refused before any tool is launched.
//!
//! Whenever a configuration is loaded or saved, its path is written to the pointer file
//! `last_used_config.yaml` (next to the executable by default), which is used to restore the
//! last configuration on the next start.
//!
//! ## Updating PSA files
//!
//! Updating rewrites the `<InputDir value=.../>`, `<OutputDir value=.../>` and, only if
//! present, `<InstrumentPath value=.../>` elements of every PSA file. Paths are written
//! absolute with forward slashes. Everything else in the file is left exactly as it was.
//!
//! ## Running
//!
//! For every raw file, each enabled step is run as
//!
//! ```text
//! <exe> /i<input file> /o<output dir> /f<base>.cnv /p<psa file> /s [/c<raw dir>/<BASE>.xmlcon]
//! ```
//!
//! A tool that fails (non-zero exit or missing executable) is reported, and the run carries on
//! with the next step and the next raw file.
pub mod config;
pub mod error;
pub mod launcher;
pub mod planner;
pub mod resolver;
pub mod rewrite;
pub mod scan;
pub mod session;
pub mod status;
pub mod step;
pub mod tool;
