use todo_core::{Filter, Synchronizer, User};

pub fn todos(sync: &Synchronizer, filter: Filter) {
    let counts = sync.counts();
    println!(
        "All ({})  Active ({})  Completed ({})",
        counts.all, counts.active, counts.completed
    );

    let view = sync.view(filter);
    if view.is_empty() {
        match filter {
            Filter::All => println!("No todos found."),
            other => println!("No todos found. No {other} todos."),
        }
        return;
    }

    for todo in view {
        let mark = if todo.complete { "x" } else { " " };
        print!("[{mark}] #{:<4} {:<9} {}", todo.id, todo.priority_label(), todo.title);
        if todo.description.is_empty() {
            println!();
        } else {
            println!(" - {}", todo.description);
        }
    }
}

pub fn profile(user: &User) {
    let or_missing = |s: &str| {
        if s.is_empty() {
            "Not provided".to_string()
        } else {
            s.to_string()
        }
    };
    println!("Email:        {}", user.email);
    println!("Name:         {}", user.display_name());
    println!("First name:   {}", or_missing(&user.first_name));
    println!("Last name:    {}", or_missing(&user.last_name));
    println!("Phone number: {}", or_missing(&user.phone_number));
    println!(
        "Role:         {}",
        if user.role.is_empty() { "User" } else { &user.role }
    );
}
