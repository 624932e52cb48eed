use puzzle_latin_solver::{Difficulty, SolveOutcome, UserDeductions};
use puzzle_random::Rng;
use puzzle_util::names;

#[cfg(feature = "telemetry-subscriber")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "puzzle_latin_solver=trace,puzzle_matching=trace,puzzle_divvy=trace,puzzle_loopfind=trace,puzzle_cli=info",
        )
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(not(feature = "telemetry-subscriber"))]
fn init_tracing() {}

fn usage() -> &'static str {
    "puzzle-cli\n\
\n\
USAGE:\n\
  puzzle-cli dsf --n <N> --merge <A:B,...>\n\
  puzzle-cli rng --seed <SEED> --bits <K> [--count <C>]\n\
  puzzle-cli match --nl <NL> --nr <NR> --adj <L:R,...> [--seed <SEED>]\n\
  puzzle-cli solve --order <N> --grid <DIGITS> [--max-difficulty <simple|set0|set1|forcing|recursion>]\n\
  puzzle-cli generate --order <N> [--width <W> --height <H>] --seed <SEED>\n\
  puzzle-cli divvy --width <W> --height <H> --piece-size <K> --seed <SEED>\n\
  puzzle-cli loops --n <N> --edges <U:V,...>\n\
\n\
EXAMPLES:\n\
  puzzle-cli dsf --n 5 --merge 0:1,1:2\n\
  puzzle-cli rng --seed abc123 --bits 8 --count 5\n\
  puzzle-cli match --nl 3 --nr 3 --adj 0:0,0:1,1:1,2:2\n\
  puzzle-cli solve --order 4 --grid 1...2.........3.. --max-difficulty recursion\n\
  puzzle-cli generate --order 4 --seed mysave\n\
  puzzle-cli divvy --width 9 --height 4 --piece-size 6 --seed mysave\n\
  puzzle-cli loops --n 4 --edges 0:1,1:2,2:0,2:3\n"
}

fn parse_arg_value(args: &[String], i: &mut usize) -> Result<String, String> {
    *i += 1;
    args.get(*i).cloned().ok_or_else(|| "missing value".to_string())
}

fn parse_pairs(s: &str) -> Result<Vec<(usize, usize)>, String> {
    s.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (a, b) = part
                .split_once(':')
                .ok_or_else(|| format!("expected A:B, got '{part}'"))?;
            let a = a.parse::<usize>().map_err(|_| format!("bad index '{a}'"))?;
            let b = b.parse::<usize>().map_err(|_| format!("bad index '{b}'"))?;
            Ok((a, b))
        })
        .collect()
}

fn parse_difficulty(s: &str) -> Option<Difficulty> {
    match s {
        "simple" => Some(Difficulty::Simple),
        "set0" => Some(Difficulty::Set0),
        "set1" => Some(Difficulty::Set1),
        "forcing" => Some(Difficulty::Forcing),
        "recursion" => Some(Difficulty::Recursion),
        _ => None,
    }
}

fn parse_grid(s: &str, order: u8) -> Result<Vec<u8>, String> {
    s.chars()
        .map(|c| {
            if c == '.' || c == '0' {
                Ok(0)
            } else {
                names::parse_digit(c).ok_or_else(|| format!("bad grid digit '{c}'"))
            }
        })
        .collect::<Result<Vec<u8>, String>>()
        .and_then(|grid| {
            if grid.len() != order as usize * order as usize {
                Err(format!(
                    "grid has {} cells, expected {} for order {order}",
                    grid.len(),
                    order as usize * order as usize
                ))
            } else {
                Ok(grid)
            }
        })
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("{err}\n\n{}", usage());
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        return Err("missing command".to_string());
    }

    let cmd = args[1].as_str();
    let mut n: Option<usize> = None;
    let mut nl: Option<usize> = None;
    let mut nr: Option<usize> = None;
    let mut order: Option<u8> = None;
    let mut width: Option<usize> = None;
    let mut height: Option<usize> = None;
    let mut piece_size: Option<usize> = None;
    let mut seed: Option<String> = None;
    let mut merge: Option<String> = None;
    let mut adj: Option<String> = None;
    let mut edges: Option<String> = None;
    let mut grid: Option<String> = None;
    let mut bits: Option<u32> = None;
    let mut count: u32 = 1;
    let mut max_difficulty: Difficulty = Difficulty::Recursion;

    let mut i = 2usize;
    while i < args.len() {
        match args[i].as_str() {
            "--n" => n = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --n".to_string())?),
            "--nl" => nl = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --nl".to_string())?),
            "--nr" => nr = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --nr".to_string())?),
            "--order" => {
                order = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --order".to_string())?)
            }
            "--width" => {
                width = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --width".to_string())?)
            }
            "--height" => {
                height = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --height".to_string())?)
            }
            "--piece-size" => {
                piece_size =
                    Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --piece-size".to_string())?)
            }
            "--seed" => seed = Some(parse_arg_value(&args, &mut i)?),
            "--merge" => merge = Some(parse_arg_value(&args, &mut i)?),
            "--adj" => adj = Some(parse_arg_value(&args, &mut i)?),
            "--edges" => edges = Some(parse_arg_value(&args, &mut i)?),
            "--grid" => grid = Some(parse_arg_value(&args, &mut i)?),
            "--bits" => bits = Some(parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --bits".to_string())?),
            "--count" => {
                count = parse_arg_value(&args, &mut i)?.parse().map_err(|_| "invalid --count".to_string())?
            }
            "--max-difficulty" => {
                let v = parse_arg_value(&args, &mut i)?;
                max_difficulty = parse_difficulty(&v).ok_or_else(|| "invalid --max-difficulty".to_string())?;
            }
            "--help" | "-h" => {
                println!("{}", usage());
                return Ok(());
            }
            other => return Err(format!("unknown arg: {other}")),
        }
        i += 1;
    }

    let rng_of = |seed: &Option<String>| -> Rng {
        match seed {
            Some(s) => Rng::new(s.as_bytes()),
            None => Rng::new(b"puzzle-cli-default-seed"),
        }
    };

    match cmd {
        "dsf" => {
            let n = n.ok_or("'dsf' requires --n")?;
            let mut dsf = puzzle_dsf::Dsf::new(n);
            if let Some(m) = merge {
                for (a, b) in parse_pairs(&m)? {
                    dsf.merge(a, b);
                }
            }
            for x in 0..n {
                println!("{x} -> {} (size={})", dsf.canonify(x), dsf.size(x));
            }
        }
        "rng" => {
            let bits = bits.ok_or("'rng' requires --bits")?;
            let mut rng = rng_of(&seed);
            for _ in 0..count {
                println!("{}", rng.bits(bits));
            }
        }
        "match" => {
            let nl = nl.ok_or("'match' requires --nl")?;
            let nr = nr.ok_or("'match' requires --nr")?;
            let adj_spec = adj.ok_or("'match' requires --adj")?;
            let mut adjacency = vec![Vec::new(); nl];
            for (l, r) in parse_pairs(&adj_spec)? {
                adjacency[l].push(r as u32);
            }
            let mut rng = seed.as_ref().map(|_| rng_of(&seed));
            let m = puzzle_matching::matching(nl, nr, &mut adjacency, rng.as_mut())
                .map_err(|e| e.to_string())?;
            println!("size={}", m.size);
            for (l, r) in m.out_l.iter().enumerate() {
                println!("L{l} -> {}", if *r < 0 { "unmatched".to_string() } else { r.to_string() });
            }
        }
        "solve" => {
            let order = order.ok_or("'solve' requires --order")?;
            let grid_spec = grid.ok_or("'solve' requires --grid")?;
            let initial = parse_grid(&grid_spec, order)?;
            let user = UserDeductions::default();
            let outcome = puzzle_latin_solver::solve(&initial, order, max_difficulty, &user, None)
                .map_err(|e| e.to_string())?;
            match outcome {
                SolveOutcome::Solved { grid, difficulty } => {
                    println!("solved (difficulty={difficulty:?})");
                    println!("{}", names::render_grid(&grid, order));
                }
                SolveOutcome::Impossible => println!("impossible"),
                SolveOutcome::Unfinished => println!("unfinished"),
                SolveOutcome::Ambiguous => println!("ambiguous"),
            }
        }
        "generate" => {
            let order = order.ok_or("'generate' requires --order")?;
            let mut rng = rng_of(&seed);
            let grid = match (width, height) {
                (Some(w), Some(h)) => puzzle_latin_gen::generate_rect(w, h, &mut rng).map_err(|e| e.to_string())?,
                _ => puzzle_latin_gen::generate(order as usize, &mut rng).map_err(|e| e.to_string())?,
            };
            let print_width = width.unwrap_or(order as usize) as u8;
            println!("{}", names::render_grid(&grid, print_width));
        }
        "divvy" => {
            let width = width.ok_or("'divvy' requires --width")?;
            let height = height.ok_or("'divvy' requires --height")?;
            let piece_size = piece_size.ok_or("'divvy' requires --piece-size")?;
            let mut rng = rng_of(&seed);
            let (dsf, attempts) =
                puzzle_divvy::divvy_rectangle_with_attempts(width, height, piece_size, &mut rng)
                    .map_err(|e| e.to_string())?;
            println!("attempts={attempts}");
            for row in 0..height {
                let line = (0..width)
                    .map(|col| dsf.canonify_ro(row * width + col).to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }
        }
        "loops" => {
            let n = n.ok_or("'loops' requires --n")?;
            let edges_spec = edges.ok_or("'loops' requires --edges")?;
            let pairs = parse_pairs(&edges_spec)?;
            let mut adjacency = vec![Vec::new(); n];
            for (u, v) in &pairs {
                adjacency[*u].push(*v);
                adjacency[*v].push(*u);
            }
            let mut source = puzzle_loopfind::AdjacencyList::new(adjacency);
            let mut state = puzzle_loopfind::new_state(n);
            let has_cycle = puzzle_loopfind::run(&mut state, &mut source);
            println!("has_cycle={has_cycle}");
            for (u, v) in pairs {
                let mut u_side = 0;
                let mut v_side = 0;
                if state.is_bridge(u, v, &mut u_side, &mut v_side) {
                    println!("{u}:{v} bridge (sides {u_side}/{v_side})");
                } else {
                    println!("{u}:{v} loop-edge");
                }
            }
        }
        _ => return Err(format!("unknown command: {cmd}")),
    }

    Ok(())
}
