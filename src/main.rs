use base64::{prelude::*, write::EncoderWriter};
use bcrypt_core::{
    Cost, Setting,
    self_test::{Case, CastCost5Empty, CastCost5Short, CastCost5Truncated, CastCost16},
};
use clap::Parser;

#[cfg(feature = "core_affinity")]
use std::num::NonZeroUsize;

use std::{
    io::{Read, Write},
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(clap::Subcommand)]
enum Command {
    /// Run the known answer self tests
    Cast {
        #[arg(short, long, help = "skip the cost 16 case")]
        fast: bool,
    },
    /// Hash a password, read from stdin unless given
    Hash {
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long, default_value_t = Cost::DEFAULT)]
        cost: Cost,
        #[arg(short, long, help = "use this setting instead of a random salt")]
        setting: Option<String>,
    },
    /// Check a password against a hash, exits with 1 on mismatch
    Verify {
        #[arg(short = 'H', long)]
        hash: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Print a fresh setting
    Gensalt {
        #[arg(short, long, default_value_t = Cost::DEFAULT)]
        cost: Cost,
        #[arg(long, help = "pick the cost by timing this machine")]
        auto: bool,
    },
    /// Derive a key with bcrypt_pbkdf
    Pbkdf {
        #[arg(short, long)]
        key: Option<String>,
        #[arg(short, long)]
        salt: Option<String>,
        #[arg(short, long, default_value = "16")]
        rounds: u32,
        #[arg(short, long, default_value = "32")]
        output_len: usize,
        #[arg(long)]
        output_raw: bool,
    },
    /// Report hashes per second
    Throughput {
        #[arg(short, long, default_value_t = Cost::DEFAULT)]
        cost: Cost,
    },
}

#[derive(Parser)]
struct Args {
    #[arg(short, long, default_value = "1")]
    num_threads: usize,
    #[cfg(feature = "core_affinity")]
    #[arg(long, default_value = "1")]
    core_stride: NonZeroUsize,
    #[command(subcommand)]
    command: Command,
}

fn slurp_stdin() -> std::io::Result<Box<[u8]>> {
    let mut stdin = std::io::stdin().lock();
    let mut buffer = Vec::new();
    stdin.read_to_end(&mut buffer)?;
    Ok(buffer.into_boxed_slice())
}

// a password typed on a terminal comes with a line break
fn password_or_stdin(password: Option<String>) -> std::io::Result<Box<[u8]>> {
    match password {
        Some(password) => Ok(password.into_bytes().into_boxed_slice()),
        None => {
            let mut data = slurp_stdin()?.into_vec();
            if data.last() == Some(&b'\n') {
                data.pop();
                if data.last() == Some(&b'\r') {
                    data.pop();
                }
            }
            Ok(data.into_boxed_slice())
        }
    }
}

#[cfg(feature = "core_affinity")]
struct CoreAffinityAssigner {
    core_ids: Option<Vec<core_affinity::CoreId>>,
    stride: NonZeroUsize,
    ptr: usize,
}

#[cfg(feature = "core_affinity")]
impl CoreAffinityAssigner {
    fn new(mut stride: NonZeroUsize) -> Self {
        let core_ids = core_affinity::get_core_ids();

        if let Some(core_ids) = &core_ids {
            stride = NonZeroUsize::new(stride.get() % core_ids.len()).unwrap_or(NonZeroUsize::MIN);
        }

        Self {
            core_ids,
            stride,
            ptr: 0,
        }
    }

    fn next(&mut self) -> Option<core_affinity::CoreId> {
        let core_ids = self.core_ids.as_ref()?;

        let ret = core_ids[self.ptr];

        self.ptr += self.stride.get();
        if self.ptr >= core_ids.len() {
            self.ptr -= core_ids.len();
            if core_ids.len() > 1 {
                self.ptr += 1;
            }
        }

        Some(ret)
    }
}

// 0 on a match, 1 on a mismatch or a malformed hash
fn verify_status(result: bcrypt_core::Result<bool>) -> u8 {
    match result {
        Ok(true) => {
            println!("OK");
            0
        }
        Ok(false) => {
            println!("MISMATCH");
            1
        }
        Err(e) => {
            eprintln!("invalid hash: {}", e);
            1
        }
    }
}

fn cast(fast: bool) {
    macro_rules! case {
        ($name:literal, $c:block) => {{
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "Testing: {} ... ", $name);
            let _ = stdout.flush();
            let start = std::time::Instant::now();
            $c
            let elapsed = start.elapsed();
            let _ = writeln!(stdout, "PASS ({} ms)", elapsed.as_millis());
        }};
    }

    case!("$2a$05$ short", { CastCost5Short::algorithm_self_test() });
    case!("$2a$05$ empty", { CastCost5Empty::algorithm_self_test() });
    case!("$2a$05$ truncated", {
        CastCost5Truncated::algorithm_self_test()
    });

    if !fast {
        case!("$2b$16$", { CastCost16::algorithm_self_test() });
    }

    println!("------ PASSED ALL TESTS ------");
}

fn throughput(
    num_threads: usize,
    cost: Cost,
    #[cfg(feature = "core_affinity")] core_stride: NonZeroUsize,
) -> ! {
    let counter = Arc::new(AtomicU64::new(0));

    #[cfg(feature = "core_affinity")]
    let mut core_assigner = CoreAffinityAssigner::new(core_stride);

    for thread_idx in 0..num_threads {
        #[cfg(feature = "core_affinity")]
        let core = core_assigner.next();

        let counter = Arc::clone(&counter);

        std::thread::spawn(move || {
            #[cfg(feature = "core_affinity")]
            if let Some(core) = core {
                if !core_affinity::set_for_current(core) {
                    eprintln!("Failed to set core affinity for thread {}", thread_idx);
                }
            }

            let setting = bcrypt_core::gen_setting(cost);
            let mut password = [0u8; 8];
            for i in (thread_idx as u64).. {
                // keep the password free of NUL bytes
                password.copy_from_slice(&(i | 0x0101_0101_0101_0101).to_le_bytes());
                let parts = bcrypt_core::hash_with_setting(&password, &setting);
                core::hint::black_box(parts.ok());
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    println!(
        "Started {} threads (cost={}, rounds={})",
        num_threads,
        cost,
        cost.rounds()
    );

    let mut prev = counter.load(Ordering::Relaxed);
    loop {
        std::thread::sleep(std::time::Duration::from_millis(1000));
        let cur = counter.load(Ordering::Relaxed);
        println!("Thrpt: {} c/s (total: {})", cur - prev, cur);
        prev = cur;
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::Cast { fast } => {
            cast(fast);
            ExitCode::SUCCESS
        }
        Command::Hash {
            password,
            cost,
            setting,
        } => {
            let setting = match setting {
                Some(setting) => match setting.parse::<Setting>() {
                    Ok(setting) => setting,
                    Err(e) => {
                        eprintln!("invalid setting: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
                None => bcrypt_core::gen_setting(cost),
            };
            let password = match password_or_stdin(password) {
                Ok(password) => password,
                Err(e) => {
                    eprintln!("failed to read password: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match bcrypt_core::hash_with_setting(&password, &setting) {
                Ok(parts) => {
                    println!("{}", parts);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("hashing failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Verify { hash, password } => {
            let password = match password_or_stdin(password) {
                Ok(password) => password,
                Err(e) => {
                    eprintln!("failed to read password: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            ExitCode::from(verify_status(bcrypt_core::verify(&password, &hash)))
        }
        Command::Gensalt { cost, auto } => {
            let cost = if auto {
                let cost = bcrypt_core::auto_cost();
                eprintln!("picked cost {}", cost);
                cost
            } else {
                cost
            };
            println!("{}", bcrypt_core::gen_setting(cost));
            ExitCode::SUCCESS
        }
        Command::Pbkdf {
            key,
            salt,
            rounds,
            output_len,
            output_raw,
        } => {
            if key.is_none() && salt.is_none() {
                eprintln!("at least one of key or salt is required");
                return ExitCode::FAILURE;
            }

            let mut key = key.map(|s| s.into_bytes().into_boxed_slice());
            let mut salt = salt.map(|s| s.into_bytes().into_boxed_slice());

            if key.is_none() || salt.is_none() {
                let data = match slurp_stdin() {
                    Ok(data) => data,
                    Err(e) => {
                        eprintln!("failed to read stdin: {}", e);
                        return ExitCode::FAILURE;
                    }
                };

                if key.is_some() {
                    salt = Some(data);
                } else {
                    key = Some(data);
                }
            }

            let (Some(key), Some(salt)) = (key, salt) else {
                return ExitCode::FAILURE;
            };

            let mut output = vec![0; output_len].into_boxed_slice();
            if let Err(e) = bcrypt_core::bcrypt_pbkdf(&key, &salt, rounds, &mut output) {
                eprintln!("key derivation failed: {}", e);
                return ExitCode::FAILURE;
            }

            let mut stdout = std::io::stdout();
            let written = if output_raw {
                stdout.write_all(&output)
            } else {
                let mut write = EncoderWriter::new(&mut stdout, &BASE64_STANDARD);
                write
                    .write_all(&output)
                    .and_then(|_| write.finish())
                    .and_then(|out| out.write_all(b"\n"))
            };
            match written.and_then(|_| stdout.flush()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("failed to write output: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Throughput { cost } => throughput(
            args.num_threads,
            cost,
            #[cfg(feature = "core_affinity")]
            args.core_stride,
        ),
    }
}
