fn main() {
    course_billing::run();
}
