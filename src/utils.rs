use rand::Rng;

pub(crate) fn gen_random_name() -> String {
    let mut rng = rand::rng();
    let mut name = String::with_capacity(10);
    for _ in 0..10 {
        name.push(rng.random_range('a'..='z'));
    }
    name
}
