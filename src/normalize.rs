pub fn stage0(text: &str, fake_x86_fp80: bool) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = if fake_x86_fp80 {
        text.replace("x86_fp80", "double")
    } else {
        text
    };
    text.split('\n')
        .map(|l| l.trim_end().to_string())
        .collect()
}
