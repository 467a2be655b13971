// host runner: assemble a source file, then either write the image out or
// mount it and drive the machine until it halts or the clock runs out.
use anyhow::Context;
use clap::Parser;
use nova64::{ Machine, Port };
use std::path::PathBuf;
use std::time::{ Duration, Instant };


#[derive(Parser)]
#[command(about = "assemble and run nova64 images")]
struct Args {
    /// assembly source file
    source : PathBuf,

    /// write the assembled image here instead of running it
    #[arg(short, long)]
    output : Option<PathBuf>,

    /// machine memory in bytes
    #[arg(long, default_value_t = 4 * 1024 * 1024)]
    memory : usize,

    /// wall-clock run time in milliseconds
    #[arg(long, default_value_t = 500)]
    run_for : u64,
}


// the reference output device on port 1: words go to stdout as characters
struct Console;


impl Port for Console {
    fn read(&mut self) -> u32 {
        0
    }

    fn write(&mut self, value : u32) {
        print!("{}", char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    fn has_data(&self) -> bool {
        false
    }
}


fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("reading {}", args.source.display()))?;
    let started = Instant::now();
    let image = nova64::asm::assemble(&source)?;
    log::info!("assembled {} words in {:?}", image.code().len(), started.elapsed());

    if let Some(output) = args.output {
        std::fs::write(&output, image.to_bytes())
            .with_context(|| format!("writing {}", output.display()))?;
        return Ok(());
    }

    let mut machine = Machine::new(args.memory);
    log::info!("ram size: {} words, {} bytes", machine.ram().len(), machine.ram().len() * 4);
    machine.mount(&image)?;
    machine.register_port(1, Box::new(Console));

    // the deadline is only consulted between batches of ticks
    let deadline = Instant::now() + Duration::from_millis(args.run_for);
    while !machine.halted() && Instant::now() < deadline {
        for _ in 0..1024 {
            machine.tick();
        }
    }
    log::info!("machine {} after {:?}", if machine.halted() { "halted" } else { "still running" }, started.elapsed());
    Ok(())
}
