#![forbid(unsafe_code)]

// Native-only CLI. Keep a stub `main` so `--target wasm32-unknown-unknown --workspace` still builds.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::{self, BufWriter, Write};
    use std::path::PathBuf;

    use anyhow::{bail, Context, Result};
    use clap::Parser;
    use bus_space::SharedAddressSpace;
    use vme_machine::{CardCatalog, Machine, MachineConfig};

    #[derive(Debug, Parser)]
    #[command(about = "Builds a VME machine from a JSON description and pokes its address space")]
    pub struct Args {
        /// Machine description (JSON). Defaults to a 68000 board with a D16 memory card.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Processor whose program space `--read`/`--write` go through.
        #[arg(long, default_value = vme::DEFAULT_OWNER_TAG)]
        cpu: String,

        /// Access the space bus `TAG` routes into instead of a processor's program space.
        #[arg(long, value_name = "TAG", conflicts_with = "cpu")]
        bus: Option<String>,

        /// Read `ADDR[:WIDTH]`; width is 8, 16 or 32 (default 16). Repeatable.
        #[arg(long = "read", value_name = "ADDR[:WIDTH]", value_parser = parse_read)]
        reads: Vec<Access>,

        /// Write `ADDR=VALUE[:WIDTH]`. Repeatable; all writes run before any read.
        #[arg(long = "write", value_name = "ADDR=VALUE[:WIDTH]", value_parser = parse_write)]
        writes: Vec<Access>,

        /// Print the machine config as JSON and exit.
        #[arg(long)]
        dump_config: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access {
        pub addr: u32,
        pub value: u32,
        pub width: u8,
    }

    pub fn parse_u32(s: &str) -> Result<u32> {
        let s = s.trim().replace('_', "");
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed.with_context(|| format!("invalid number {s:?}"))
    }

    fn split_width(s: &str) -> Result<(&str, u8)> {
        let Some((rest, width)) = s.rsplit_once(':') else {
            return Ok((s, 16));
        };
        match width.trim_start_matches(['d', 'D']) {
            "8" => Ok((rest, 8)),
            "16" => Ok((rest, 16)),
            "32" => Ok((rest, 32)),
            other => bail!("unsupported access width {other:?} (expected 8, 16 or 32)"),
        }
    }

    pub fn parse_read(s: &str) -> Result<Access> {
        let (addr, width) = split_width(s)?;
        Ok(Access {
            addr: parse_u32(addr)?,
            value: 0,
            width,
        })
    }

    pub fn parse_write(s: &str) -> Result<Access> {
        let (rest, width) = split_width(s)?;
        let Some((addr, value)) = rest.split_once('=') else {
            bail!("expected ADDR=VALUE[:WIDTH], got {s:?}");
        };
        let value = parse_u32(value)?;
        if width < 32 && value >> width != 0 {
            bail!("value {value:#x} does not fit in {width} bits");
        }
        Ok(Access {
            addr: parse_u32(addr)?,
            value,
            width,
        })
    }

    /// Prints each bus with its resolved width, cards in registry order and installed mappings.
    pub fn report(machine: &Machine, out: &mut impl Write) -> io::Result<()> {
        for bus in machine.buses() {
            let bus = bus.borrow();
            let Some(resolved) = bus.resolved() else {
                writeln!(out, "bus {}: not started", bus.tag())?;
                continue;
            };
            let space = resolved.space().borrow();
            match resolved.owner() {
                Some(cpu) => writeln!(
                    out,
                    "bus {}: D{} space {:?} (owned by {cpu})",
                    bus.tag(),
                    resolved.width(),
                    space.name()
                )?,
                None => writeln!(
                    out,
                    "bus {}: D{} space {:?}",
                    bus.tag(),
                    resolved.width(),
                    space.name()
                )?,
            }
            for card in bus.cards().iter() {
                let card = card.borrow();
                let binding = card.binding();
                writeln!(
                    out,
                    "  slot {}: {} ({})",
                    binding.slot(),
                    card.name(),
                    binding.slot_tag().unwrap_or("-")
                )?;
            }
            for m in space.mappings() {
                writeln!(
                    out,
                    "  map {:08x}..={:08x} D{} mask={:08x}",
                    m.start, m.end, m.width, m.mask
                )?;
            }
        }
        Ok(())
    }

    /// The space `--read`/`--write` target: the bus's space with `--bus`, else the processor's.
    fn target_space(machine: &Machine, args: &Args) -> Result<SharedAddressSpace> {
        let Some(tag) = &args.bus else {
            return machine
                .cpu_space(&args.cpu)
                .with_context(|| format!("no processor tagged {:?}", args.cpu));
        };
        let bus = machine
            .bus(tag)
            .with_context(|| format!("no bus tagged {tag:?}"))?;
        let space = bus.borrow().space().cloned();
        space.with_context(|| format!("bus {tag:?} is not started"))
    }

    fn run_accesses(machine: &Machine, args: &Args, out: &mut impl Write) -> Result<()> {
        if args.reads.is_empty() && args.writes.is_empty() {
            return Ok(());
        }
        let space = target_space(machine, args)?;
        let mut space = space.borrow_mut();

        for w in &args.writes {
            match w.width {
                8 => space.write_u8(w.addr, w.value as u8),
                32 => space.write_u32(w.addr, w.value),
                _ => space.write_u16(w.addr, w.value as u16),
            }
            writeln!(out, "write D{} {:08x} = {:x}", w.width, w.addr, w.value)?;
        }
        for r in &args.reads {
            let value = match r.width {
                8 => u32::from(space.read_u8(r.addr)),
                32 => space.read_u32(r.addr),
                _ => u32::from(space.read_u16(r.addr)),
            };
            writeln!(out, "read  D{} {:08x} = {:x}", r.width, r.addr, value)?;
        }
        Ok(())
    }

    pub fn main() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();

        let args = Args::parse();

        let config = match &args.config {
            Some(path) => MachineConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => MachineConfig::sys68k_defaults(),
        };

        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());

        if args.dump_config {
            writeln!(out, "{}", config.to_json_pretty()?)?;
            out.flush()?;
            return Ok(());
        }

        let mut machine = Machine::from_config(&config, &CardCatalog::default())?;
        machine.start().context("machine start failed")?;
        tracing::info!("machine ready");

        report(&machine, &mut out)?;
        run_accesses(&machine, &args, &mut out)?;
        out.flush()?;
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}
