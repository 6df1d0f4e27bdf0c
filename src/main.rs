use clap::{arg,crate_version,ArgMatches,Command};
use classic_codecs::{huffman,lz77};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn codec_command(name: &'static str,about: &'static str) -> Command {
    Command::new(name)
        .arg(arg!(-d --decompress "decompress instead of compressing"))
        .arg(arg!(<INPUT> "input path"))
        .arg(arg!(<OUTPUT> "output path"))
        .about(about)
}

fn run(method: &str,cmd: &ArgMatches) -> STDRESULT {
    let path_in = cmd.get_one::<String>("INPUT").expect(RCH);
    let path_out = cmd.get_one::<String>("OUTPUT").expect(RCH);
    let decompress = cmd.get_flag("decompress");
    let mut in_file = std::fs::File::open(path_in)?;
    let mut out_file = std::fs::File::create(path_out)?;
    log::debug!("{} {} -> {}",method,path_in,path_out);
    let (in_size,out_size) = match (method,decompress) {
        ("huffman",false) => huffman::compress(&mut in_file,&mut out_file)?,
        ("huffman",true) => huffman::expand(&mut in_file,&mut out_file)?,
        ("lz77",false) => lz77::compress(&mut in_file,&mut out_file)?,
        ("lz77",true) => lz77::expand(&mut in_file,&mut out_file)?,
        _ => panic!("{}",RCH)
    };
    match decompress {
        true => eprintln!("expanded {} into {}",in_size,out_size),
        false => eprintln!("compressed {} into {}",in_size,out_size)
    }
    Ok(())
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `classic_codecs lz77 my_file my_file.lz77`
Expand:        `classic_codecs lz77 -d my_file.lz77 my_file`";

    let main_cmd = Command::new("classic_codecs")
        .about("Compress and expand with Huffman coding or LZ77")
        .after_long_help(long_help)
        .version(crate_version!())
        .subcommand_required(true)
        .subcommand(codec_command("huffman","Huffman coding"))
        .subcommand(codec_command("lz77","LZ77 sliding window compression"));

    let matches = main_cmd.get_matches();
    match matches.subcommand() {
        Some((method,cmd)) => run(method,cmd),
        None => panic!("{}",RCH)
    }
}
