// Built-in question pool. Guilds can add their own on top of these.

pub const DEFAULT_QUESTIONS: &[&str] = &[
    "Who here is most likely to survive a zombie apocalypse?",
    "Who would you call first if you needed bail money?",
    "Who here is most likely to become famous?",
    "Who would you trust to plan your wedding?",
    "Who is the worst driver in this group?",
    "Who here would last the longest without their phone?",
    "Who is most likely to cry during a movie?",
    "Who would you want on your team for a pub quiz?",
    "Who here is secretly the most competitive?",
    "Who is most likely to forget someone's birthday?",
    "Who would be the first to get lost in a forest?",
    "Who here gives the best advice?",
    "Who is most likely to start a cult?",
    "Who would you swap lives with for a day?",
    "Who here is the worst at keeping secrets?",
    "Who is most likely to adopt ten cats?",
    "Who would win in an argument with a wall?",
    "Who here would make the best villain?",
    "Who is most likely to laugh at the wrong moment?",
    "Who would you want with you on a desert island?",
    "Who here has the most embarrassing search history?",
    "Who is most likely to become a reality TV star?",
    "Who here would be the worst roommate?",
    "Who is the most likely to accidentally join a pyramid scheme?",
    "Who here would you ask to hide a body?",
];
